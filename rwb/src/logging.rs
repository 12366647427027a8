//! Tracing setup for hosts embedding the bridge.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::log_bridge::LogLevel;

/// Environment variable consulted by [`LogConfig::from_env`].
pub const LOG_ENV_VAR: &str = "RWB_LOG";

/// Logging configuration for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: LogLevel,
    stderr: bool,
    file: Option<PathBuf>,
}

impl LogConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            stderr: false,
            file: None,
        }
    }

    /// Build a config from `RWB_LOG`, falling back to `default` when the
    /// variable is unset or unparseable.
    pub fn from_env(default: LogLevel) -> Self {
        let level = std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default);
        Self::new(level)
    }

    /// Override the level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Also write human-readable output to stderr.
    #[must_use]
    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }

    /// Also write JSON lines to the given file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

/// Initialize the global tracing subscriber.
///
/// Returns the appender guards; hold them for the lifetime of the process so
/// buffered file output gets flushed. Fails if a subscriber is already
/// installed.
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>> {
    let mut guards = Vec::new();

    let filter = EnvFilter::try_new(config.level.as_str())
        .with_context(|| format!("invalid log filter '{}'", config.level))?;

    let file_layer = match &config.file {
        Some(path) => {
            let parent = path.parent().unwrap_or(Path::new("."));
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            guards.push(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer),
            )
        }
        None => None,
    };

    let stderr_layer = config.stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("logging already initialized")?;

    Ok(guards)
}
