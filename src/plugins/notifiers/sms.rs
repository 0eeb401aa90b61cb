use async_trait::async_trait;
use config::ConfigError;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::SmsConfig;
use crate::models::Listing;
use crate::plugins::traits::{NotificationChannel, NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
}

impl TwilioOptions {
    pub fn from_settings(settings: &SmsConfig) -> Result<Self> {
        let field = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(ConfigError::NotFound(key.to_string())))
        };

        Ok(TwilioOptions {
            account_sid: field(&settings.account_sid, "sms.account_sid")?,
            auth_token: field(&settings.auth_token, "sms.auth_token")?,
            from_number: field(&settings.from_number, "sms.from_number")?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

/// Sends the run summary as a text message through the Twilio REST API.
pub struct SmsNotifier {
    client: Client,
    settings: SmsConfig,
}

impl SmsNotifier {
    pub fn new(settings: SmsConfig) -> Self {
        SmsNotifier {
            client: Client::new(),
            settings,
        }
    }

    pub fn format_body(listings: &[Listing]) -> String {
        format!("Found {} new listings!", listings.len())
    }
}

#[async_trait]
impl NotifierPlugin for SmsNotifier {
    fn name(&self) -> &str {
        "SMS Notifier"
    }

    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Sms
    }

    fn description(&self) -> &str {
        "Sends a one-line listing count as an SMS via Twilio"
    }

    fn is_configured(&self) -> bool {
        TwilioOptions::from_settings(&self.settings).is_ok()
    }

    async fn notify(&self, recipient: &str, listings: &[Listing]) -> Result<NotificationResult> {
        let options = TwilioOptions::from_settings(&self.settings)?;

        let mut form_body: HashMap<&str, String> = HashMap::new();
        form_body.insert("To", recipient.to_string());
        form_body.insert("From", options.from_number.clone());
        form_body.insert("Body", Self::format_body(listings));

        let response = self
            .client
            .post(options.messages_url())
            .basic_auth(&options.account_sid, Some(&options.auth_token))
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Twilio error ({}): {}", status, error_body);
            return Ok(NotificationResult::failed(format!(
                "Twilio returned {}: {}",
                status, error_body
            )));
        }

        let message_id = match response.json::<MessageResponse>().await {
            Ok(MessageResponse { sid: Some(sid) }) => sid,
            Ok(MessageResponse { sid: None }) => format!("sms-{}", chrono::Utc::now().timestamp()),
            Err(e) => {
                tracing::warn!("Failed to parse Twilio response: {}", e);
                format!("sms-{}", chrono::Utc::now().timestamp())
            }
        };

        tracing::info!("SMS sent to {} ({})", recipient, message_id);
        Ok(NotificationResult::delivered(message_id))
    }
}
