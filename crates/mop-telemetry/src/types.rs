//! Core telemetry types.
//!
//! A [`TelemetryReading`] is one stored sample from a device: a per-device
//! sequence number plus a map of metric names to raw JSON values. Metric
//! values stay untyped here; the rule engine decides how to interpret them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single telemetry reading reported by a device.
///
/// Readings are immutable once stored. `seq` increases monotonically per
/// device; nothing in this crate verifies that it is contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    /// Unique identifier of the stored reading.
    pub id: String,
    /// The device that produced the reading.
    pub device_id: String,
    /// Per-device sequence number.
    pub seq: u64,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Raw metric values keyed by metric name.
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
    /// Free-form string metadata attached by the device.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl TelemetryReading {
    /// Creates a reading with a fresh ID and the current timestamp.
    #[must_use]
    pub fn new(device_id: impl Into<String>, seq: u64, metrics: BTreeMap<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            device_id: device_id.into(),
            seq,
            timestamp: Utc::now(),
            metrics,
            meta: BTreeMap::new(),
        }
    }

    /// Creates a new reading builder.
    pub fn builder(device_id: impl Into<String>, seq: u64) -> TelemetryReadingBuilder {
        TelemetryReadingBuilder::new(device_id, seq)
    }

    /// Returns the raw value of a metric, if present.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&Value> {
        self.metrics.get(name)
    }

    /// Returns true if the reading carries no metrics.
    #[must_use]
    pub fn has_no_metrics(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterates metric names in sorted order.
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }
}

/// Builder for [`TelemetryReading`] instances.
#[derive(Debug)]
pub struct TelemetryReadingBuilder {
    id: Option<String>,
    device_id: String,
    seq: u64,
    timestamp: Option<DateTime<Utc>>,
    metrics: BTreeMap<String, Value>,
    meta: BTreeMap<String, String>,
}

impl TelemetryReadingBuilder {
    fn new(device_id: impl Into<String>, seq: u64) -> Self {
        Self {
            id: None,
            device_id: device_id.into(),
            seq,
            timestamp: None,
            metrics: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    /// Sets an explicit reading ID instead of a generated one.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the reading timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Adds a metric value.
    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Builds the [`TelemetryReading`].
    #[must_use]
    pub fn build(self) -> TelemetryReading {
        TelemetryReading {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            device_id: self.device_id,
            seq: self.seq,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            metrics: self.metrics,
            meta: self.meta,
        }
    }
}
