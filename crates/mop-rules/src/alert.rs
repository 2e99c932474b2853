//! Alert records and the sink they are written to.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// A record that a rule matched a telemetry reading.
///
/// Alerts are append-only; processing the same reading twice records two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Unique alert ID.
    pub id: String,
    /// Rule that matched.
    pub rule_id: String,
    /// Reading that triggered the match.
    pub telemetry_id: String,
    /// When the alert was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Creates an alert with a fresh ID, stamped now.
    #[must_use]
    pub fn new(rule_id: impl Into<String>, telemetry_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            rule_id: rule_id.into(),
            telemetry_id: telemetry_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for alerts raised by the processor.
pub trait AlertSink: Send + Sync + fmt::Debug {
    /// Records an alert for `rule_id` against `telemetry_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert cannot be persisted.
    fn create(&self, rule_id: &str, telemetry_id: &str) -> Result<Alert>;
}

/// Thread-safe in-memory alert log.
///
/// Clones share the same underlying data.
#[derive(Debug, Default)]
pub struct InMemoryAlertSink {
    alerts: Arc<RwLock<Vec<Alert>>>,
}

impl InMemoryAlertSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all alerts in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<Alert> {
        self.alerts.read().clone()
    }

    /// Returns the number of recorded alerts.
    #[must_use]
    pub fn count(&self) -> usize {
        self.alerts.read().len()
    }

    /// Returns the alerts raised by one rule.
    #[must_use]
    pub fn for_rule(&self, rule_id: &str) -> Vec<Alert> {
        self.alerts
            .read()
            .iter()
            .filter(|a| a.rule_id == rule_id)
            .cloned()
            .collect()
    }

    /// Returns the alerts raised against one reading.
    #[must_use]
    pub fn for_telemetry(&self, telemetry_id: &str) -> Vec<Alert> {
        self.alerts
            .read()
            .iter()
            .filter(|a| a.telemetry_id == telemetry_id)
            .cloned()
            .collect()
    }

    /// Discards all alerts.
    pub fn clear(&self) {
        self.alerts.write().clear();
    }
}

impl Clone for InMemoryAlertSink {
    fn clone(&self) -> Self {
        Self {
            alerts: Arc::clone(&self.alerts),
        }
    }
}

impl AlertSink for InMemoryAlertSink {
    fn create(&self, rule_id: &str, telemetry_id: &str) -> Result<Alert> {
        let alert = Alert::new(rule_id, telemetry_id);
        self.alerts.write().push(alert.clone());
        Ok(alert)
    }
}
