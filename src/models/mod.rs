pub mod listing;
pub mod search_config;

// Re-exports for convenience
pub use listing::*;
pub use search_config::*;
