//! Error types for mop-worker.

use mop_rules::RuleError;
use mop_telemetry::TelemetryError;
use thiserror::Error;

/// Errors that can occur while configuring or running the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A fixture file could not be loaded.
    #[error("fixture error in '{path}': {reason}")]
    Fixture {
        /// Path of the fixture file.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Rule engine error.
    #[error("rule engine error: {0}")]
    Rules(#[from] RuleError),

    /// Telemetry store error.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
