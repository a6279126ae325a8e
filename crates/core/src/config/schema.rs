//! Tool configuration schema
//!
//! Settings for the resolver itself, not for the app being built.

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where to find the inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Manifest path used when `--manifest` is not given
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Credentials file name, resolved next to the manifest
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            credentials_file: default_credentials_file(),
        }
    }
}

fn default_manifest() -> String {
    "android/build-manifest.toml".to_string()
}

fn default_credentials_file() -> String {
    "key.properties".to_string()
}

/// Validation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Treat a missing signing credential as an error
    #[serde(default)]
    pub require_signing: bool,

    /// Warn when a signed build type falls back to debug signing
    #[serde(default = "default_true")]
    pub warn_unsigned_release: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_signing: false,
            warn_unsigned_release: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
