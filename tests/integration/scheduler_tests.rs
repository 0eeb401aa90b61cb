use super::*;
use listing_scout::AppError;
use listing_scout::config::SchedulerConfig;
use listing_scout::scheduler::SearchScheduler;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_scheduled_cycles_run_and_notify() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.write_search_config(json!({
        "search_params": {"model": "VW ID4", "year": "2022"},
        "notifications": {"email": "me@example.com", "phone": "+15550100"}
    }))?;
    env.serve_listings(TWO_LISTINGS).await;

    let (plugins, email, _sms) = recording_plugins().await;
    let runner = Arc::new(env.runner(plugins)?);
    let mut scheduler = SearchScheduler::with_interval(runner, Duration::from_secs(1)).await?;

    let (failures_tx, mut failures_rx) = mpsc::unbounded_channel();
    scheduler.start(failures_tx).await?;
    assert!(scheduler.is_started());

    let email = &email;
    let notified = wait_for_condition(move || async move { !email.sent().is_empty() }, 10).await;
    assert!(notified, "scheduled search never notified");

    scheduler.shutdown().await?;
    assert!(!scheduler.is_started());

    let stats = scheduler.stats().await;
    assert!(stats.run_count >= 1);
    assert!(stats.notified_count >= 1);
    assert_eq!(stats.error_count, 0);
    assert!(failures_rx.try_recv().is_err());

    Ok(())
}

#[tokio::test]
async fn test_failed_tick_forwards_error() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.write_search_config(json!({"search_params": {"model": "VW ID4", "year": "2022"}}))?;
    env.serve_listings(r#"<div class="listing-item"><span class="price">$1</span></div>"#)
        .await;

    let (plugins, _email, _sms) = recording_plugins().await;
    let runner = Arc::new(env.runner(plugins)?);
    let mut scheduler = SearchScheduler::with_interval(runner, Duration::from_secs(1)).await?;

    let (failures_tx, mut failures_rx) = mpsc::unbounded_channel();
    scheduler.start(failures_tx).await?;

    let error = tokio::time::timeout(Duration::from_secs(10), failures_rx.recv())
        .await?
        .expect("failure channel closed");
    scheduler.shutdown().await?;

    assert!(matches!(error, AppError::ElementNotFound { ref selector } if selector == ".title"));
    let stats = scheduler.stats().await;
    assert!(stats.error_count >= 1);
    assert!(stats.last_error.is_some());

    Ok(())
}

#[tokio::test]
async fn test_start_twice_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (plugins, _email, _sms) = recording_plugins().await;
    let runner = Arc::new(env.runner(plugins)?);

    let mut scheduler = SearchScheduler::new(runner, &SchedulerConfig { interval_minutes: 60 }).await?;
    let (failures_tx, _failures_rx) = mpsc::unbounded_channel();

    scheduler.start(failures_tx.clone()).await?;
    let second = scheduler.start(failures_tx).await;
    assert!(matches!(second, Err(AppError::Validation(_))));

    scheduler.shutdown().await?;
    Ok(())
}
