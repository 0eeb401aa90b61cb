use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchSettings,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub smtp: SmtpConfig,
    pub sms: SmsConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// JSON document holding search parameters and notification recipients
    pub config_path: PathBuf,
    pub base_url: String,
    pub required_fields: Vec<String>,
    pub selectors: SelectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectorConfig {
    pub item: String,
    pub title: String,
    pub price: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Seconds; no timeout when unset
    pub request_timeout: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub endpoint: Option<String>,
    pub project_key: Option<String>,
    /// Falls back to RUN_MODE when empty
    pub environment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("data/config.json"),
            base_url: "https://www.example.com/search".to_string(),
            required_fields: vec!["model".to_string(), "year".to_string()],
            selectors: SelectorConfig::default(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item: ".listing-item".to_string(),
            title: ".title".to_string(),
            price: ".price".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_minutes: 60 }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "Listing Scout".to_string(),
            subject: "New Car Listings Found".to_string(),
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base: "https://api.twilio.com".to_string(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            project_key: None,
            environment: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            file_name: "application.log".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Built-in defaults cover everything except credentials
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Secrets arrive here, e.g. SCOUT__SMTP__PASSWORD
            .add_source(Environment::with_prefix("SCOUT").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        if config.telemetry.environment.is_empty() {
            config.telemetry.environment = run_mode;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = Url::parse(&self.search.base_url)
            .map_err(|_| ConfigError::Message("Invalid search base URL format".into()))?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(ConfigError::Message("Search base URL must use http or https".into()));
        }

        for (name, selector) in [
            ("item", &self.search.selectors.item),
            ("title", &self.search.selectors.title),
            ("price", &self.search.selectors.price),
        ] {
            if scraper::Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(format!("Invalid {} selector: {}", name, selector)));
            }
        }

        if self.scheduler.interval_minutes == 0 {
            return Err(ConfigError::Message("Scheduler interval_minutes must be greater than 0".into()));
        }

        if self.smtp.port == 0 {
            return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
        }

        if let Some(endpoint) = &self.telemetry.endpoint {
            if Url::parse(endpoint).is_err() {
                return Err(ConfigError::Message("Invalid telemetry endpoint URL".into()));
            }
        }

        if self.logging.file_name.is_empty() {
            return Err(ConfigError::Message("Logging file_name must not be empty".into()));
        }

        Ok(())
    }
}
