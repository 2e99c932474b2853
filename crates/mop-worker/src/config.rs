//! Worker configuration.
//!
//! Read from a TOML file; every field has a default, so an empty file is a
//! valid configuration. Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkerError};

/// Default name of the notification queue.
pub const DEFAULT_QUEUE: &str = "device-data-notifications";

/// Upper bound on concurrent workers.
pub const MAX_WORKERS: usize = 64;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `mop_rules=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Main worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Queue the notifications arrive on. Informational only.
    pub queue: String,
    /// Number of concurrent workers.
    pub workers: usize,
    /// Capacity of each worker's inbox.
    pub channel_capacity: usize,
    /// Fixture file seeding the in-memory stores.
    pub fixtures: Option<PathBuf>,
    /// Logging configuration.
    pub log: LogConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            workers: 1,
            channel_capacity: 256,
            fixtures: None,
            log: LogConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkerError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| WorkerError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.queue.trim().is_empty() {
            return Err(WorkerError::Config("queue cannot be empty".to_string()));
        }

        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(WorkerError::Config(format!(
                "workers must be between 1 and {MAX_WORKERS}, got {}",
                self.workers
            )));
        }

        if self.channel_capacity == 0 {
            return Err(WorkerError::Config(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }

        if self.log.level.trim().is_empty() {
            return Err(WorkerError::Config("log level cannot be empty".to_string()));
        }

        Ok(())
    }
}
