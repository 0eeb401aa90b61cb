pub mod config;
pub mod crash_reporter;
pub mod logging;
pub mod models;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod search;
pub mod telemetry;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use search::{SearchOutcome, SearchRunner};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
