//! Turns queue notifications into processing calls.

use std::fmt;

use mop_rules::{ProcessingReport, RuleError, RuleProcessor};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Message announcing a newly stored telemetry reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDataNotification {
    /// ID of the stored reading.
    pub device_data_id: String,
}

/// What happened to one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// The reading was processed.
    Processed(ProcessingReport),
    /// The payload was not a usable notification.
    Rejected {
        /// Why it was rejected.
        reason: String,
    },
    /// Processing failed; redelivery may succeed.
    Failed {
        /// The telemetry ID that failed.
        telemetry_id: String,
        /// The error message.
        error: String,
    },
}

impl ListenerOutcome {
    /// Returns true if the reading was processed.
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

impl fmt::Display for ListenerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processed(report) => write!(
                f,
                "processed {}: {} alert(s)",
                report.telemetry_id,
                report.alerts.len()
            ),
            Self::Rejected { reason } => write!(f, "rejected: {reason}"),
            Self::Failed {
                telemetry_id,
                error,
            } => write!(f, "failed {telemetry_id}: {error}"),
        }
    }
}

/// Handles raw notification payloads.
///
/// Errors never escape [`handle`](Self::handle); they are logged and
/// reported as an outcome, leaving retry policy to the transport.
#[derive(Debug, Clone)]
pub struct NotificationListener {
    processor: RuleProcessor,
}

impl NotificationListener {
    /// Creates a listener that feeds `processor`.
    #[must_use]
    pub fn new(processor: RuleProcessor) -> Self {
        Self { processor }
    }

    /// Parses `payload` and processes the announced reading.
    pub fn handle(&self, payload: &str) -> ListenerOutcome {
        let notification = match serde_json::from_str::<DeviceDataNotification>(payload) {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "malformed device data notification");
                return ListenerOutcome::Rejected {
                    reason: e.to_string(),
                };
            }
        };

        let telemetry_id = notification.device_data_id;
        if telemetry_id.trim().is_empty() {
            error!("device data notification has an empty id");
            return ListenerOutcome::Rejected {
                reason: "empty deviceDataId".to_string(),
            };
        }

        debug!(telemetry_id = %telemetry_id, "received device data notification");

        match self.processor.process_telemetry(&telemetry_id) {
            Ok(report) => ListenerOutcome::Processed(report),
            Err(e) => {
                match &e {
                    RuleError::TelemetryNotFound { .. } => {
                        error!(telemetry_id = %telemetry_id, "notified reading does not exist");
                    }
                    other => {
                        error!(telemetry_id = %telemetry_id, error = %other, "failed to process telemetry");
                    }
                }
                ListenerOutcome::Failed {
                    telemetry_id,
                    error: e.to_string(),
                }
            }
        }
    }
}
