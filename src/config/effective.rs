//! Effective configuration with provenance
//!
//! Merges built-in defaults, the config file, the environment and CLI
//! flags (later wins), records where each layer came from, and keeps a
//! redacted copy of the result for display.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use super::settings::{missing_keys, Settings};

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "JENKDO_CONFIG";

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Where to look for the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    /// Explicitly requested files must exist
    pub required: bool,
}

impl ConfigFile {
    /// `--config`, else `$JENKDO_CONFIG`, else `~/.config/jenkdo/config.toml`
    pub fn locate(
        explicit: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<Self> {
        if let Some(path) = explicit {
            return Some(Self {
                path: path.to_path_buf(),
                required: true,
            });
        }
        if let Some(path) = lookup(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(Self {
                path: PathBuf::from(path),
                required: true,
            });
        }
        lookup("HOME").map(|home| Self {
            path: PathBuf::from(home).join(".config/jenkdo/config.toml"),
            required: false,
        })
    }
}

/// Layers other than the built-in defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    pub file: Option<ConfigFile>,
    pub env: Option<Value>,
    pub cli: Option<Value>,
}

/// Merged configuration, its provenance, and the typed settings
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration with secrets redacted
    pub config: Value,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,

    #[serde(skip)]
    settings: Option<Settings>,

    #[serde(skip)]
    settings_error: Option<String>,

    #[serde(skip)]
    missing: Vec<&'static str>,
}

/// Keys whose values are never shown
const SECRET_KEYS: &[&str] = &["password", "token", "secret"];

const REDACTED: &str = "[REDACTED]";

impl EffectiveConfig {
    /// Merge the layers.
    ///
    /// File and parse errors fail immediately. Missing or invalid settings
    /// are kept and reported by [`EffectiveConfig::settings`], so an
    /// incomplete configuration can still be printed.
    pub fn build(layers: ConfigLayers) -> Result<Self, ConfigError> {
        let mut values = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(file) = layers.file {
            if file.path.exists() {
                let (value, digest) = load_toml_file(&file.path)?;
                values.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::File,
                    path: Some(file.path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            } else if file.required {
                return Err(ConfigError::IoError(format!(
                    "config file '{}' does not exist",
                    file.path.display()
                )));
            }
        }

        for (origin, layer) in [(ConfigOrigin::Env, layers.env), (ConfigOrigin::Cli, layers.cli)] {
            if let Some(value) = layer {
                values.push(value);
                sources.push(ConfigSource {
                    origin,
                    path: None,
                    digest: None,
                });
            }
        }

        let mut merged = merge_layers(values);
        let missing = missing_keys(&merged);
        let (settings, settings_error) = match Settings::from_value(&merged) {
            Ok(settings) => (Some(settings), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let redactions = redact_secrets(&mut merged);

        Ok(Self {
            created_at: Utc::now(),
            config: merged,
            sources,
            redactions,
            settings,
            settings_error,
            missing,
        })
    }

    /// Typed settings, or why the merged configuration is unusable
    pub fn settings(&self) -> Result<&Settings, ConfigError> {
        match (&self.settings, &self.settings_error) {
            (Some(settings), _) => Ok(settings),
            (None, Some(reason)) => Err(ConfigError::ValidationError(reason.clone())),
            (None, None) => Err(ConfigError::ValidationError("no settings".to_string())),
        }
    }

    /// Whether a required key was left unset by every layer
    pub fn is_missing(&self, key: &str) -> bool {
        self.missing.iter().any(|missing| *missing == key)
    }

    /// Pretty JSON of the redacted configuration and its sources
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.config, |current, part| current.get(part))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(Value::as_u64)
    }
}

/// Load and parse a TOML file, returning the value and the digest of its bytes
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
    let table: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    Ok((toml_to_json(table), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Redact secret-looking scalars in place, returning their paths
fn redact_secrets(value: &mut Value) -> Vec<String> {
    let mut redactions = Vec::new();
    redact_recursive(value, String::new(), &mut redactions);
    redactions
}

fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    if let Value::Object(map) = value {
        for (key, val) in map.iter_mut() {
            let current_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };

            let key_lower = key.to_lowercase();
            let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));
            if is_secret && !val.is_object() && !val.is_array() {
                *val = Value::String(REDACTED.to_string());
                redactions.push(current_path);
            } else {
                redact_recursive(val, current_path, redactions);
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("missing required setting '{0}' (set it in the config file, the environment, or on the command line)")]
    Missing(&'static str),
}
