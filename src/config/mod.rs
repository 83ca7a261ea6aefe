//! Layered configuration
//!
//! Layers, later wins:
//! 1. Built-in defaults
//! 2. Config file (`$JENKDO_CONFIG` or `~/.config/jenkdo/config.toml`)
//! 3. Environment (`JENKDO_URL`, `JENKDO_USER`, `JENKDO_PASSWORD`)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{
    ConfigError, ConfigFile, ConfigLayers, ConfigOrigin, ConfigSource, EffectiveConfig, CONFIG_ENV,
};
pub use merge::{deep_merge, merge_layers};
pub use settings::{env_layer, missing_keys, Settings, ENV_KEYS, REQUIRED_KEYS};
