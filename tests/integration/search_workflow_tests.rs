use super::*;
use listing_scout::AppError;
use listing_scout::plugins::NotifyOutcome;
use listing_scout::search::{SearchOutcome, SearchState};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::query_param;

#[tokio::test]
async fn test_cycle_scrapes_and_notifies_both_channels() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.write_search_config(json!({
        "search_params": {"model": "VW ID4", "year": "2022"},
        "notifications": {"email": "me@example.com", "phone": "+15550100"}
    }))?;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("model", "VW ID4"))
        .and(query_param("year", "2022"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TWO_LISTINGS))
        .expect(1)
        .mount(&env.site)
        .await;

    let (plugins, email, sms) = recording_plugins().await;
    let runner = env.runner(plugins)?;
    let report = runner.run_cycle().await?;

    let expected = vec![
        Listing::new("Car A", "$10,000"),
        Listing::new("Car B", "$12,000"),
    ];
    assert_eq!(report.search, SearchOutcome::Completed(expected.clone()));
    assert!(matches!(report.notification, Some(NotifyOutcome::Sent(ref r)) if r.len() == 2));

    assert_eq!(email.sent(), vec![("me@example.com".to_string(), expected.clone())]);
    assert_eq!(sms.sent(), vec![("+15550100".to_string(), expected)]);
    assert_eq!(runner.state(), SearchState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_missing_year_makes_no_request() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.write_search_config(json!({"search_params": {"model": "VW ID4"}}))?;
    env.serve_listings(TWO_LISTINGS).await;

    let (plugins, email, sms) = recording_plugins().await;
    let runner = env.runner(plugins)?;
    let report = runner.run_cycle().await?;

    assert_eq!(
        report.search,
        SearchOutcome::MissingParameters(vec!["year".to_string()])
    );
    assert!(report.notification.is_none());
    assert_eq!(env.site_requests().await, 0);
    assert!(email.sent().is_empty());
    assert!(sms.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_missing_config_file_reports_both_fields() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let (plugins, _email, _sms) = recording_plugins().await;
    let report = env.runner(plugins)?.run_cycle().await?;

    assert_eq!(
        report.search,
        SearchOutcome::MissingParameters(vec!["model".to_string(), "year".to_string()])
    );
    assert_eq!(env.site_requests().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_results_without_recipients_send_nothing() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.write_search_config(json!({"search_params": {"model": "VW ID4", "year": "2022"}}))?;
    env.serve_listings(TWO_LISTINGS).await;

    let (plugins, email, sms) = recording_plugins().await;
    let report = env.runner(plugins)?.run_cycle().await?;

    assert!(matches!(report.search, SearchOutcome::Completed(ref l) if l.len() == 2));
    assert_eq!(report.notification, Some(NotifyOutcome::MissingRecipients));
    assert!(email.sent().is_empty());
    assert!(sms.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_page_skips_notification() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.write_search_config(json!({
        "search_params": {"model": "VW ID4", "year": "2022"},
        "notifications": {"email": "me@example.com", "phone": "+15550100"}
    }))?;
    env.serve_listings("<html><body><p>No results</p></body></html>").await;

    let (plugins, email, _sms) = recording_plugins().await;
    let report = env.runner(plugins)?.run_cycle().await?;

    assert_eq!(report.search, SearchOutcome::Completed(vec![]));
    assert!(report.notification.is_none());
    assert!(email.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_error_status_page_is_still_parsed() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.write_search_config(json!({"search_params": {"model": "VW ID4", "year": "2022"}}))?;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string(TWO_LISTINGS))
        .mount(&env.site)
        .await;

    let (plugins, _email, _sms) = recording_plugins().await;
    let report = env.runner(plugins)?.run_cycle().await?;

    assert!(matches!(report.search, SearchOutcome::Completed(ref l) if l.len() == 2));
    Ok(())
}

#[tokio::test]
async fn test_malformed_listing_fails_and_releases_runner() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.write_search_config(json!({"search_params": {"model": "VW ID4", "year": "2022"}}))?;
    env.serve_listings(r#"<div class="listing-item"><span class="title">Car A</span></div>"#)
        .await;

    let (plugins, email, _sms) = recording_plugins().await;
    let runner = env.runner(plugins)?;
    let err = runner.run_cycle().await.unwrap_err();

    assert!(matches!(err, AppError::ElementNotFound { ref selector } if selector == ".price"));
    assert_eq!(runner.state(), SearchState::Idle);
    assert!(email.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_overlapping_search_is_dropped() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(TWO_LISTINGS)
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&env.site)
        .await;

    let (plugins, _email, _sms) = recording_plugins().await;
    let runner = env.runner(plugins)?;

    let mut params = listing_scout::models::SearchParameters::new();
    params.insert("model".to_string(), "VW ID4".to_string());
    params.insert("year".to_string(), "2022".to_string());

    let (first, second) = tokio::join!(runner.run_search(&params), runner.run_search(&params));

    assert!(matches!(first?, SearchOutcome::Completed(ref l) if l.len() == 2));
    assert_eq!(second?, SearchOutcome::Skipped);
    assert_eq!(env.site_requests().await, 1);
    assert_eq!(runner.state(), SearchState::Idle);

    // Runner accepts new work once the first search is done
    assert!(matches!(runner.run_search(&params).await?, SearchOutcome::Completed(_)));
    Ok(())
}
