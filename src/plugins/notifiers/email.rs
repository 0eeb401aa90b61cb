use async_trait::async_trait;
use config::ConfigError;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::models::Listing;
use crate::plugins::traits::{NotificationChannel, NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};

/// SMTP settings with every credential present.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub subject: String,
}

impl EmailConfig {
    pub fn from_settings(settings: &SmtpConfig) -> Result<Self> {
        let smtp_server = required(&settings.host, "smtp.host")?;
        let username = required(&settings.username, "smtp.username")?;
        let password = required(&settings.password, "smtp.password")?;
        // The login doubles as the sender when no explicit address is set
        let from_email = settings
            .from_address
            .clone()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| username.clone());

        Ok(EmailConfig {
            smtp_server,
            smtp_port: settings.port,
            username,
            password,
            from_email,
            from_name: settings.from_name.clone(),
            subject: settings.subject.clone(),
        })
    }
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(ConfigError::NotFound(key.to_string())))
}

pub struct EmailNotifier {
    settings: SmtpConfig,
}

impl EmailNotifier {
    pub fn new(settings: SmtpConfig) -> Self {
        EmailNotifier { settings }
    }

    pub fn format_text_body(listings: &[Listing]) -> String {
        let lines: Vec<String> = listings.iter().map(Listing::summary_line).collect();
        format!("New listings found:\n{}", lines.join("\n"))
    }

    fn build_message(&self, config: &EmailConfig, recipient: &str, listings: &[Listing]) -> Result<Message> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email).parse()?;
        let to: Mailbox = recipient.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(config.subject.clone())
            .header(header::ContentType::TEXT_PLAIN)
            .body(Self::format_text_body(listings))?;
        Ok(email)
    }
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Email
    }

    fn description(&self) -> &str {
        "Sends a plain-text listing summary over SMTP with STARTTLS"
    }

    fn is_configured(&self) -> bool {
        EmailConfig::from_settings(&self.settings).is_ok()
    }

    async fn notify(&self, recipient: &str, listings: &[Listing]) -> Result<NotificationResult> {
        let config = EmailConfig::from_settings(&self.settings)?;
        let email = self.build_message(&config, recipient, listings)?;

        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        match mailer.send(email).await {
            Ok(response) => {
                tracing::info!("Email with {} listings sent to {}", listings.len(), recipient);
                let message_id = response
                    .message()
                    .next()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("email-{}", chrono::Utc::now().timestamp()));
                Ok(NotificationResult::delivered(message_id))
            }
            Err(e) => {
                tracing::error!("SMTP submission to {} failed: {}", config.smtp_server, e);
                Ok(NotificationResult::failed(e.to_string()))
            }
        }
    }
}
