pub mod traits;
pub mod manager;
pub mod notifiers;

pub use manager::{ChannelReport, NotifyOutcome, PluginManager};
pub use traits::{NotificationChannel, NotificationResult, NotifierPlugin};
