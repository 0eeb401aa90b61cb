use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::config::TelemetryConfig;
use crate::utils::error::{AppError, Result};

pub const PROJECT_KEY_HEADER: &str = "X-Telemetry-Key";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub message: String,
    /// Source chain of a captured error, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    pub environment: String,
    pub release: String,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TelemetryEvent {
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            causes: Vec::new(),
            environment: String::new(),
            release: env!("CARGO_PKG_VERSION").to_string(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn from_error(error: &anyhow::Error) -> Self {
        let mut event = Self::new(EventLevel::Error, error.to_string());
        event.causes = error.chain().skip(1).map(|cause| cause.to_string()).collect();
        event
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Forwards crash and message events to the reporting backend. Without an
/// endpoint every capture is a logged no-op.
#[derive(Clone)]
pub struct TelemetryClient {
    client: Client,
    endpoint: Option<Url>,
    project_key: Option<String>,
    environment: String,
}

impl TelemetryClient {
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let endpoint = config.endpoint.as_deref().map(Url::parse).transpose()?;
        if endpoint.is_some() && config.project_key.is_none() {
            tracing::warn!("Telemetry endpoint set without a project key");
        }

        Ok(Self {
            client: Client::new(),
            endpoint,
            project_key: config.project_key.clone(),
            environment: config.environment.clone(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            endpoint: None,
            project_key: None,
            environment: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub async fn capture_error(&self, error: &anyhow::Error) -> Result<Uuid> {
        self.send(TelemetryEvent::from_error(error)).await
    }

    pub async fn capture_message(
        &self,
        message: &str,
        level: EventLevel,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Uuid> {
        let mut event = TelemetryEvent::new(level, message);
        event.extra = extra;
        self.send(event).await
    }

    /// Posts the event and waits for the backend to accept it.
    pub async fn send(&self, mut event: TelemetryEvent) -> Result<Uuid> {
        let Some(endpoint) = &self.endpoint else {
            tracing::debug!("Telemetry disabled; dropping event {}", event.event_id);
            return Ok(event.event_id);
        };

        if event.environment.is_empty() {
            event.environment = self.environment.clone();
        }

        let mut request = self.client.post(endpoint.clone()).json(&event);
        if let Some(key) = &self.project_key {
            request = request.header(PROJECT_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Telemetry(format!(
                "backend rejected event {} with {}",
                event.event_id, status
            )));
        }

        tracing::debug!("Telemetry event {} delivered", event.event_id);
        Ok(event.event_id)
    }
}
