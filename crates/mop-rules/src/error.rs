//! Error types for the mop-rules crate.
//!
//! Rule content that is malformed is never an error here: the evaluator
//! treats it as "not satisfied". These variants cover missing records,
//! rejected rule management requests, and store failures.

use mop_telemetry::TelemetryError;
use thiserror::Error;

/// Errors that can occur in the rule engine.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The telemetry reading being processed does not exist.
    #[error("telemetry not found: {id}")]
    TelemetryNotFound {
        /// The telemetry ID that was not found.
        id: String,
    },

    /// Rule with the given ID was not found.
    #[error("rule not found: {id}")]
    RuleNotFound {
        /// The rule ID that was not found.
        id: String,
    },

    /// A rule with the given ID already exists.
    #[error("rule already exists: {id}")]
    DuplicateRule {
        /// The conflicting rule ID.
        id: String,
    },

    /// Rule management request rejected.
    #[error("invalid rule: {reason}")]
    InvalidRule {
        /// The reason the rule is invalid.
        reason: String,
    },

    /// Rule store or alert sink failure.
    #[error("store error: {0}")]
    Store(String),

    /// Telemetry store failure.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for rule engine operations.
pub type Result<T> = std::result::Result<T, RuleError>;
