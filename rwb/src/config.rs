//! Bridge configuration from environment variables.

use thiserror::Error;

use crate::log_bridge::{LEVEL_BUFFER, LogLevel};
use crate::types::ClientKind;

/// Prefix for every bridge environment variable.
pub const ENV_PREFIX: &str = "RWB_";

/// A configuration value could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },
}

/// Host-facing bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// How the host is delivered; drives the workspace suffix rule.
    pub client: ClientKind,
    /// Initial local log level.
    pub log_level: LogLevel,
    /// Broadcast buffer for pending log-level change notifications.
    pub channel_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            client: ClientKind::Desktop,
            log_level: LogLevel::Info,
            channel_buffer: LEVEL_BUFFER,
        }
    }
}

impl BridgeConfig {
    /// Read configuration from `RWB_`-prefixed environment variables.
    ///
    /// Bad values fall back to the defaults; every problem is collected so
    /// all of them can be reported at once.
    pub fn from_env() -> (Self, Vec<ConfigError>) {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration using `lookup` to fetch variables by full name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<ConfigError>) {
        let mut errors = Vec::new();
        let mut config = Self::default();

        let client_var = format!("{ENV_PREFIX}CLIENT");
        if let Some(value) = lookup(&client_var) {
            match value.to_ascii_lowercase().as_str() {
                "desktop" => config.client = ClientKind::Desktop,
                "web" | "browser" => config.client = ClientKind::Web,
                _ => errors.push(ConfigError::InvalidValue {
                    var: client_var,
                    expected: "desktop or web".to_string(),
                    value,
                }),
            }
        }

        let level_var = format!("{ENV_PREFIX}LOG_LEVEL");
        if let Some(value) = lookup(&level_var) {
            match value.parse() {
                Ok(level) => config.log_level = level,
                Err(_) => errors.push(ConfigError::InvalidValue {
                    var: level_var,
                    expected: "trace|debug|info|warn|error|off".to_string(),
                    value,
                }),
            }
        }

        let buffer_var = format!("{ENV_PREFIX}CHANNEL_BUFFER");
        if let Some(value) = lookup(&buffer_var) {
            match value.parse::<usize>() {
                Ok(n) if n >= 1 => config.channel_buffer = n,
                _ => errors.push(ConfigError::InvalidValue {
                    var: buffer_var,
                    expected: "positive integer".to_string(),
                    value,
                }),
            }
        }

        (config, errors)
    }
}
