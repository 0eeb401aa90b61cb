use super::*;
use listing_scout::AppError;
use listing_scout::config::SmtpConfig;
use listing_scout::models::NotificationConfig;
use listing_scout::plugins::NotifyOutcome;
use wiremock::matchers::body_string_contains;

fn listings() -> Vec<Listing> {
    vec![
        Listing::new("Car A", "$10,000"),
        Listing::new("Car B", "$12,000"),
    ]
}

fn twilio_path() -> &'static str {
    "/2010-04-01/Accounts/AC123/Messages.json"
}

async fn default_plugins(smtp: SmtpConfig, gateway: &MockServer) -> PluginManager {
    let config = AppConfig {
        smtp,
        sms: sms_config(&gateway.uri()),
        ..AppConfig::default()
    };
    PluginManager::with_default_notifiers(&config).await
}

#[tokio::test]
async fn test_sms_sent_even_when_email_is_unconfigured() -> anyhow::Result<()> {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(twilio_path()))
        .and(body_string_contains("Found+2+new+listings%21"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM1"})))
        .expect(1)
        .mount(&gateway)
        .await;

    let plugins = default_plugins(SmtpConfig::default(), &gateway).await;
    let err = plugins
        .notify_listings(&NotificationConfig::new("me@example.com", "+15550100"), &listings())
        .await
        .unwrap_err();

    match err {
        AppError::Notification { channel, message } => {
            assert_eq!(channel, "email");
            assert!(message.contains("smtp.host"));
        }
        other => panic!("unexpected error: {}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_gateway_rejection_reported_after_email_attempt() -> anyhow::Result<()> {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(twilio_path()))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&gateway)
        .await;

    // Nothing listens on port 1, so the SMTP submission fails too
    let smtp = SmtpConfig {
        host: Some("localhost".to_string()),
        port: 1,
        username: Some("scout@example.com".to_string()),
        password: Some("secret".to_string()),
        ..SmtpConfig::default()
    };
    let plugins = default_plugins(smtp, &gateway).await;

    let err = plugins
        .notify_listings(&NotificationConfig::new("me@example.com", "+15550100"), &listings())
        .await
        .unwrap_err();

    match err {
        AppError::Notification { channel, message } => {
            assert_eq!(channel, "email, sms");
            assert!(message.contains("401"));
        }
        other => panic!("unexpected error: {}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_missing_phone_contacts_no_channel() -> anyhow::Result<()> {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&gateway)
        .await;

    let plugins = default_plugins(SmtpConfig::default(), &gateway).await;
    let recipients = NotificationConfig {
        email: Some("me@example.com".to_string()),
        ..NotificationConfig::default()
    };

    let outcome = plugins.notify_listings(&recipients, &listings()).await?;
    assert_eq!(outcome, NotifyOutcome::MissingRecipients);

    Ok(())
}

#[tokio::test]
async fn test_recording_notifiers_receive_same_listings() -> anyhow::Result<()> {
    let (plugins, email, sms) = recording_plugins().await;

    let outcome = plugins
        .notify_listings(&NotificationConfig::new("me@example.com", "+15550100"), &listings())
        .await?;

    let NotifyOutcome::Sent(reports) = outcome else {
        panic!("expected notifications to be sent");
    };
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].channel, NotificationChannel::Email);
    assert_eq!(reports[1].channel, NotificationChannel::Sms);
    assert_eq!(email.sent()[0].1, sms.sent()[0].1);

    Ok(())
}
