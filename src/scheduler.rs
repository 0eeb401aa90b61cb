use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::plugins::NotifyOutcome;
use crate::search::{CycleReport, SearchOutcome, SearchRunner};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleStats {
    /// Cycles that reached the search step, whatever the outcome
    pub run_count: u64,
    /// Ticks dropped because a search was still running
    pub skipped_count: u64,
    pub error_count: u64,
    pub notified_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub uptime_seconds: u64,
}

/// Repeats the search-and-notify cycle at a fixed interval. Failures are
/// forwarded to whoever started the scheduler; the cycle itself never
/// retries.
pub struct SearchScheduler {
    scheduler: JobScheduler,
    runner: Arc<SearchRunner>,
    stats: Arc<RwLock<ScheduleStats>>,
    interval: Duration,
    job_id: Option<Uuid>,
    start_time: DateTime<Utc>,
}

impl SearchScheduler {
    pub async fn new(runner: Arc<SearchRunner>, config: &SchedulerConfig) -> Result<Self> {
        if config.interval_minutes == 0 {
            return Err(AppError::Validation("Search interval must be at least one minute".into()));
        }
        Self::with_interval(runner, Duration::from_secs(config.interval_minutes * 60)).await
    }

    pub async fn with_interval(runner: Arc<SearchRunner>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(AppError::Validation("Search interval must be greater than zero".into()));
        }

        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            runner,
            stats: Arc::new(RwLock::new(ScheduleStats::default())),
            interval,
            job_id: None,
            start_time: Utc::now(),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_started(&self) -> bool {
        self.job_id.is_some()
    }

    /// Registers the repeating job and starts ticking. Errors from a cycle
    /// are sent on `failures`.
    pub async fn start(&mut self, failures: mpsc::UnboundedSender<AppError>) -> Result<Uuid> {
        if let Some(job_id) = self.job_id {
            return Err(AppError::Validation(format!("Scheduler already running job {}", job_id)));
        }

        let runner = Arc::clone(&self.runner);
        let stats = Arc::clone(&self.stats);

        let job = Job::new_repeated_async(self.interval, move |_uuid, _l| {
            let runner = Arc::clone(&runner);
            let stats = Arc::clone(&stats);
            let failures = failures.clone();

            Box::pin(async move {
                if let Err(e) = Self::execute_cycle(&runner, &stats).await {
                    // Receiver gone means the process is already shutting down
                    let _ = failures.send(e);
                }
            })
        })?;

        let job_id = self.scheduler.add(job).await?;
        self.scheduler.start().await?;
        self.job_id = Some(job_id);
        self.start_time = Utc::now();

        tracing::info!("Search scheduled every {} minutes", self.interval.as_secs() / 60);
        Ok(job_id)
    }

    /// Runs one cycle immediately, outside the schedule.
    pub async fn run_now(&self) -> Result<CycleReport> {
        tracing::info!("Running immediate search");
        Self::execute_cycle(&self.runner, &self.stats).await
    }

    pub async fn stats(&self) -> ScheduleStats {
        let mut stats = self.stats.read().await.clone();
        stats.uptime_seconds = Utc::now()
            .signed_duration_since(self.start_time)
            .num_seconds()
            .max(0) as u64;
        stats
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(job_id) = self.job_id.take() {
            self.scheduler.remove(&job_id).await?;
        }
        self.scheduler.shutdown().await?;
        tracing::info!("Search scheduler stopped");
        Ok(())
    }

    async fn execute_cycle(runner: &SearchRunner, stats: &RwLock<ScheduleStats>) -> Result<CycleReport> {
        let result = runner.run_cycle().await;

        let mut stats = stats.write().await;
        match &result {
            Ok(report) => {
                match &report.search {
                    SearchOutcome::Skipped => {
                        stats.skipped_count += 1;
                        return result;
                    }
                    SearchOutcome::MissingParameters(_) | SearchOutcome::Completed(_) => {
                        stats.run_count += 1;
                    }
                }
                if let Some(NotifyOutcome::Sent(_)) = report.notification {
                    stats.notified_count += 1;
                }
                stats.last_run = Some(Utc::now());
            }
            Err(e) => {
                tracing::error!("Search cycle failed: {}", e);
                stats.run_count += 1;
                stats.error_count += 1;
                stats.last_run = Some(Utc::now());
                stats.last_error = Some(e.to_string());
            }
        }

        result
    }
}
