//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::diagnostics::DEFAULT_LOGS_DIR;
use jenkdo_protocol::{DEFAULT_FOLDER, DEFAULT_POLL_INTERVAL_MS};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Folder holding the transient jobs (default: "debug")
    pub folder: String,

    /// Failure artifact directory (default: "./logs")
    pub logs_dir: String,

    /// Per-request HTTP timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,

    /// Poll interval for every wait loop in milliseconds (default: 100)
    pub poll_interval_ms: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            folder: DEFAULT_FOLDER.to_string(),
            logs_dir: DEFAULT_LOGS_DIR.to_string(),
            request_timeout_seconds: 30,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "folder": self.folder,
            "logs_dir": self.logs_dir,
            "request_timeout_seconds": self.request_timeout_seconds,
            "poll_interval_ms": self.poll_interval_ms,
            "timeouts": {}
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.folder, "debug");
        assert_eq!(defaults.logs_dir, "./logs");
        assert_eq!(defaults.request_timeout_seconds, 30);
        assert_eq!(defaults.poll_interval_ms, 100);
    }

    #[test]
    fn test_to_value_has_no_credentials() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["folder"], "debug");
        assert_eq!(value["poll_interval_ms"], 100);
        assert!(value["timeouts"].is_object());
        assert!(value.get("url").is_none());
        assert!(value.get("password").is_none());
    }
}
