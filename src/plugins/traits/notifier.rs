use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Listing;
use crate::utils::error::Result;

/// The two ways a run's listings reach the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Sms,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Sms => "sms",
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Trait for implementing notification methods (email, SMS)
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn channel(&self) -> NotificationChannel;
    fn description(&self) -> &str;

    /// Whether every credential needed to send is present
    fn is_configured(&self) -> bool;

    /// Sends one message summarising `listings` to `recipient`.
    ///
    /// Missing credentials are an `Err`; a delivery the remote side refused
    /// comes back as an unsuccessful [`NotificationResult`].
    async fn notify(&self, recipient: &str, listings: &[Listing]) -> Result<NotificationResult>;
}
