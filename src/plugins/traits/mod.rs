pub mod notifier;

pub use notifier::{NotifierPlugin, NotificationChannel, NotificationResult};
