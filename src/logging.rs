use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::error::{AppError, Result};

pub const DEFAULT_DIRECTIVE: &str = "listing_scout=info";

/// Append-only log file. Writes land on disk before the logging call
/// returns, so a crash report can attach the lines just written.
pub fn file_writer(config: &LoggingConfig) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.directory)?;
    Ok(tracing_appender::rolling::never(
        &config.directory,
        &config.file_name,
    ))
}

/// Console output plus the log file.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let file_writer = file_writer(config)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .map_err(|e| AppError::Internal(format!("Failed to install log subscriber: {}", e)))?;

    Ok(())
}
