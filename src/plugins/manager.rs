use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::notifiers::{EmailNotifier, SmsNotifier};
use super::traits::{NotificationChannel, NotificationResult, NotifierPlugin};
use crate::config::AppConfig;
use crate::models::{Listing, NotificationConfig};
use crate::utils::error::AppError;

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

/// What one channel reported back after a send.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport {
    pub channel: NotificationChannel,
    pub result: NotificationResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// Email or phone absent; nothing was sent
    MissingRecipients,
    Sent(Vec<ChannelReport>),
}

#[derive(Clone)]
pub struct PluginManager {
    notifiers: Arc<RwLock<HashMap<NotificationChannel, NotifierPluginBox>>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Email over SMTP and SMS over Twilio, configured from `config`.
    pub async fn with_default_notifiers(config: &AppConfig) -> Self {
        let manager = Self::new();
        manager
            .register_notifier(Box::new(EmailNotifier::new(config.smtp.clone())))
            .await;
        manager
            .register_notifier(Box::new(SmsNotifier::new(config.sms.clone())))
            .await;
        manager
    }

    /// Register a notifier plugin, replacing any previous one for its channel
    pub async fn register_notifier(&self, plugin: NotifierPluginBox) {
        let channel = plugin.channel();
        if !plugin.is_configured() {
            tracing::warn!("{} registered without complete credentials", plugin.name());
        }

        let mut notifiers = self.notifiers.write().await;
        notifiers.insert(channel, plugin);
    }

    pub async fn has_notifier(&self, channel: NotificationChannel) -> bool {
        let notifiers = self.notifiers.read().await;
        notifiers.contains_key(&channel)
    }

    /// Send notification using a notifier plugin
    pub async fn send_notification(
        &self,
        channel: NotificationChannel,
        recipient: &str,
        listings: &[Listing],
    ) -> Result<NotificationResult, AppError> {
        let notifiers = self.notifiers.read().await;
        match notifiers.get(&channel) {
            Some(notifier) => notifier.notify(recipient, listings).await,
            None => Err(AppError::Notification {
                channel: channel.to_string(),
                message: "no notifier registered".to_string(),
            }),
        }
    }

    /// Sends one email and one SMS about `listings`.
    ///
    /// Both recipients must be present or nothing is sent. The two channels
    /// are attempted independently; if either fails, the failure is returned
    /// once both have been tried.
    pub async fn notify_listings(
        &self,
        recipients: &NotificationConfig,
        listings: &[Listing],
    ) -> Result<NotifyOutcome, AppError> {
        let Some((email, phone)) = recipients.recipients() else {
            tracing::error!("Email or phone number missing in search config; skipping notifications");
            return Ok(NotifyOutcome::MissingRecipients);
        };

        let mut reports = Vec::new();
        let mut failures = Vec::new();

        for (channel, recipient) in [
            (NotificationChannel::Email, email),
            (NotificationChannel::Sms, phone),
        ] {
            match self.send_notification(channel, recipient, listings).await {
                Ok(result) if result.success => reports.push(ChannelReport { channel, result }),
                Ok(result) => {
                    let message = result.error.unwrap_or_else(|| "delivery refused".to_string());
                    failures.push((channel, message));
                }
                Err(e) => {
                    tracing::error!("{} notification failed: {}", channel, e);
                    failures.push((channel, e.to_string()));
                }
            }
        }

        if !failures.is_empty() {
            let channel = failures
                .iter()
                .map(|(c, _)| c.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let message = failures
                .iter()
                .map(|(c, m)| format!("{}: {}", c, m))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AppError::Notification { channel, message });
        }

        tracing::info!("Notifications sent for {} listings", listings.len());
        Ok(NotifyOutcome::Sent(reports))
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
