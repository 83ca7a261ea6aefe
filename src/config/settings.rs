//! Typed settings
//!
//! The merged configuration, checked and turned into the values every
//! component constructor takes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use jenkdo_protocol::Endpoints;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::ConfigError;
use crate::client::Credentials;
use crate::timeout::TimeoutConfig;

/// Keys that must be present after merging
pub const REQUIRED_KEYS: &[&str] = &["url", "user", "password"];

/// Required keys that are absent or empty in a merged configuration
pub fn missing_keys(value: &Value) -> Vec<&'static str> {
    REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| {
            value
                .get(*key)
                .and_then(Value::as_str)
                .map_or(true, str::is_empty)
        })
        .collect()
}

/// Environment variables and the keys they set
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("JENKDO_URL", "url"),
    ("JENKDO_USER", "user"),
    ("JENKDO_PASSWORD", "password"),
];

/// Environment layer; unset and empty variables contribute nothing
pub fn env_layer(lookup: impl Fn(&str) -> Option<String>) -> Value {
    let map: Map<String, Value> = ENV_KEYS
        .iter()
        .filter_map(|(var, key)| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .map(|v| (key.to_string(), Value::String(v)))
        })
        .collect();
    Value::Object(map)
}

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub url: String,
    pub user: String,
    pub password: String,
    pub folder: String,
    pub logs_dir: PathBuf,
    pub request_timeout_seconds: u64,
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Settings {
    /// Check and convert a merged configuration value
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        if let Some(&key) = missing_keys(value).first() {
            return Err(ConfigError::Missing(key));
        }

        let settings: Settings = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.request_timeout_seconds == 0 || self.request_timeout_seconds > 300 {
            return Err(ConfigError::ValidationError(
                "request_timeout_seconds must be in (0, 300]".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > 60_000 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be in (0, 60000]".to_string(),
            ));
        }
        self.timeouts
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.url.as_str(), self.folder.as_str())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.as_str(), self.password.as_str())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("folder", &self.folder)
            .field("logs_dir", &self.logs_dir)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
