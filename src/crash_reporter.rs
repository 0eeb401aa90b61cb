use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::telemetry::{EventLevel, TelemetryClient};
use crate::utils::log_tail::{DEFAULT_TAIL_LINES, read_tail_or_placeholder};

/// Asks the user what they were doing when an error surfaced.
pub trait ContextPrompt: Send + Sync {
    /// `None` means the user declined to send a report.
    fn ask(&self, error_message: &str) -> Option<String>;
}

/// Reads one line from stdin when attached to a terminal. Blocks the
/// calling thread; the boundary runs it on the blocking pool.
pub struct StdinPrompt;

impl ContextPrompt for StdinPrompt {
    fn ask(&self, error_message: &str) -> Option<String> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return None;
        }

        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "An error occurred: {}", error_message);
        let _ = write!(
            stderr,
            "Describe what you were doing when this happened (empty line to skip): "
        );
        let _ = stderr.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(_) => Some(line.trim().to_string()).filter(|l| !l.is_empty()),
            Err(_) => None,
        }
    }
}

/// Never collects context; for unattended runs.
pub struct NoPrompt;

impl ContextPrompt for NoPrompt {
    fn ask(&self, _error_message: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryState {
    Idle,
    Reporting,
}

/// The last stop for errors nothing else handled. Owned by the entry
/// point; once it has started a report it stays in `Reporting`, and any
/// later error is forwarded without asking the user again.
pub struct ErrorBoundary {
    telemetry: TelemetryClient,
    log_path: PathBuf,
    prompt: Arc<dyn ContextPrompt>,
    reporting: AtomicBool,
}

impl ErrorBoundary {
    pub fn new(telemetry: TelemetryClient, log_path: PathBuf, prompt: Box<dyn ContextPrompt>) -> Self {
        Self {
            telemetry,
            log_path,
            prompt: Arc::from(prompt),
            reporting: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> BoundaryState {
        if self.reporting.load(Ordering::Acquire) {
            BoundaryState::Reporting
        } else {
            BoundaryState::Idle
        }
    }

    /// Logs and reports `error`; the returned code is what the process
    /// should exit with.
    pub async fn handle(&self, error: &anyhow::Error) -> ExitCode {
        if self.reporting.swap(true, Ordering::AcqRel) {
            self.report_additional(error).await;
            return ExitCode::FAILURE;
        }

        tracing::error!("Unhandled error: {:#}", error);
        if let Err(e) = self.telemetry.capture_error(error).await {
            tracing::warn!("Could not forward error to telemetry: {}", e);
        }

        let Some(description) = self.ask_context(error.to_string()).await else {
            tracing::info!("Bug report skipped");
            return ExitCode::FAILURE;
        };

        let log_content = read_tail_or_placeholder(&self.log_path, DEFAULT_TAIL_LINES);
        let mut extra = serde_json::Map::new();
        extra.insert("log_content".to_string(), log_content.into());

        match self
            .telemetry
            .capture_message(
                &format!("User-reported crash: {}", description),
                EventLevel::Error,
                extra,
            )
            .await
        {
            Ok(_) => tracing::info!("Bug report sent"),
            Err(e) => self.report_additional(&anyhow::Error::new(e)).await,
        }

        ExitCode::FAILURE
    }

    async fn ask_context(&self, error_message: String) -> Option<String> {
        let prompt = Arc::clone(&self.prompt);
        match tokio::task::spawn_blocking(move || prompt.ask(&error_message)).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Context prompt failed: {}", e);
                None
            }
        }
    }

    async fn report_additional(&self, error: &anyhow::Error) {
        tracing::error!("Additional unhandled error while reporting: {:#}", error);
        if let Err(e) = self.telemetry.capture_error(error).await {
            tracing::warn!("Could not forward error to telemetry: {}", e);
        }
    }
}
