use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::utils::error::Result;

/// Parameter name → value, in the order the user added them.
pub type SearchParameters = IndexMap<String, String>;

/// Parameter name → allowed values, for presentation only.
pub type ComboBoxOptions = IndexMap<String, Vec<String>>;

/// Shown in place of a value that is not among its parameter's options.
pub const OTHER_OPTION: &str = "Other";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Unknown keys are carried through a load/save cycle untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NotificationConfig {
    pub fn new(email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            phone: Some(phone.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// Both recipients, or `None` when either is absent or empty.
    pub fn recipients(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref().filter(|e| !e.is_empty())?;
        let phone = self.phone.as_deref().filter(|p| !p.is_empty())?;
        Some((email, phone))
    }
}

/// The JSON document the user edits: search parameters, their options and
/// the notification recipients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default, deserialize_with = "stringify_values")]
    pub search_params: SearchParameters,
    /// Preset choices apply only when the key is absent; an explicit `{}`
    /// stays empty.
    #[serde(default = "default_combobox_options")]
    pub combobox_options: ComboBoxOptions,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_params: SearchParameters::new(),
            combobox_options: default_combobox_options(),
            notifications: NotificationConfig::default(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Choices offered for the two required parameters out of the box.
pub fn default_combobox_options() -> ComboBoxOptions {
    let preset = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();

    let mut options = ComboBoxOptions::new();
    options.insert(
        "model".to_string(),
        preset(&["VW ID7", "VW ID3", "VW ID4", OTHER_OPTION]),
    );
    options.insert(
        "year".to_string(),
        preset(&["2019", "2020", "2021", "2022", "2023"]),
    );
    options
}

/// Strings pass through; other scalars use their JSON spelling (`true`,
/// `2022`) and `null` becomes an empty string, not `True` or `None`.
fn stringify_values<'de, D>(deserializer: D) -> std::result::Result<SearchParameters, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: IndexMap<String, serde_json::Value> = IndexMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

impl SearchConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads the document; a missing file yields an empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No search config at {}, starting empty", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!("Saved search config to {}", path.display());
        Ok(())
    }

    /// Required names that have no entry in `search_params`.
    pub fn missing_fields(&self, required: &[String]) -> Vec<String> {
        missing_fields(&self.search_params, required)
    }

    /// Adds or updates a parameter value.
    pub fn set_param(&mut self, name: &str, value: &str) {
        self.search_params.insert(name.to_string(), value.to_string());
    }

    /// Adds a new parameter. Returns false when the name is empty or taken.
    pub fn add_param(&mut self, name: &str, value: &str, options: &[String]) -> bool {
        if name.is_empty() || self.search_params.contains_key(name) {
            return false;
        }

        let options = clean_options(options);
        if !options.is_empty() {
            self.combobox_options.insert(name.to_string(), options);
        }
        self.search_params.insert(name.to_string(), value.to_string());
        true
    }

    /// Removes a parameter value. Its option list stays for later reuse.
    pub fn remove_param(&mut self, name: &str) -> Option<String> {
        self.search_params.shift_remove(name)
    }

    /// Replaces the options of an existing combobox parameter.
    pub fn set_options(&mut self, name: &str, options: &[String]) -> bool {
        match self.combobox_options.get_mut(name) {
            Some(existing) => {
                *existing = clean_options(options);
                true
            }
            None => false,
        }
    }

    /// The value as presented to the user.
    pub fn display_value(&self, name: &str) -> Option<String> {
        let value = self.search_params.get(name)?;
        match self.combobox_options.get(name) {
            Some(options) if !value.is_empty() && !options.contains(value) => {
                Some(OTHER_OPTION.to_string())
            }
            _ => Some(value.clone()),
        }
    }
}

pub fn missing_fields(params: &SearchParameters, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|field| !params.contains_key(field.as_str()))
        .cloned()
        .collect()
}

/// Trims entries and drops the empty ones.
pub fn clean_options(options: &[String]) -> Vec<String> {
    options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
