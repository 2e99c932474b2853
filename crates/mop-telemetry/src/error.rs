//! Error types for the mop-telemetry crate.

use thiserror::Error;

/// Errors that can occur when reading or storing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// No reading exists with the given ID.
    #[error("telemetry not found: {id}")]
    NotFound {
        /// The reading ID that was not found.
        id: String,
    },

    /// A reading with the same ID is already stored.
    #[error("duplicate telemetry reading: {id}")]
    DuplicateReading {
        /// The conflicting reading ID.
        id: String,
    },

    /// The reading is structurally unusable (empty identifiers).
    #[error("invalid telemetry reading: {reason}")]
    InvalidReading {
        /// The reason the reading was rejected.
        reason: String,
    },

    /// The backing store failed.
    #[error("telemetry storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;
