//! Telemetry storage contract and an in-memory implementation.
//!
//! The rule engine only ever needs two reads from telemetry storage: a lookup
//! by reading ID, and the most recent readings of one device. [`TelemetryStore`]
//! captures exactly that. [`InMemoryTelemetryStore`] keeps readings in memory
//! with a per-device index ordered by sequence number.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, TelemetryError};
use crate::types::TelemetryReading;

/// Read access to stored telemetry.
pub trait TelemetryStore: Send + Sync + fmt::Debug {
    /// Loads a reading by its ID.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::NotFound` if no reading has this ID, or a
    /// storage error if the backing store cannot be read.
    fn get_by_id(&self, id: &str) -> Result<TelemetryReading>;

    /// Returns up to `limit` readings of a device, newest first by sequence.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backing store cannot be read.
    fn recent_by_device(&self, device_id: &str, limit: usize) -> Result<Vec<TelemetryReading>>;
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<String, TelemetryReading>,
    /// Device ID -> (seq, reading ID), ascending by seq.
    by_device: HashMap<String, Vec<(u64, String)>>,
}

/// Thread-safe in-memory telemetry storage.
///
/// Clones share the same underlying data.
#[derive(Debug, Default)]
pub struct InMemoryTelemetryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTelemetryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a reading.
    ///
    /// Readings sharing a sequence number on one device are all kept; the
    /// later insert sorts after the earlier one.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::InvalidReading` if the reading or device ID is
    /// empty, and `TelemetryError::DuplicateReading` if the ID is taken.
    pub fn insert(&self, reading: TelemetryReading) -> Result<()> {
        if reading.id.is_empty() {
            return Err(TelemetryError::InvalidReading {
                reason: "reading id cannot be empty".to_string(),
            });
        }
        if reading.device_id.is_empty() {
            return Err(TelemetryError::InvalidReading {
                reason: "device id cannot be empty".to_string(),
            });
        }

        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&reading.id) {
            return Err(TelemetryError::DuplicateReading { id: reading.id });
        }

        let index = inner.by_device.entry(reading.device_id.clone()).or_default();
        let pos = index.partition_point(|(seq, _)| *seq <= reading.seq);
        index.insert(pos, (reading.seq, reading.id.clone()));

        debug!(
            reading_id = %reading.id,
            device_id = %reading.device_id,
            seq = reading.seq,
            "stored telemetry reading"
        );
        inner.by_id.insert(reading.id.clone(), reading);

        Ok(())
    }

    /// Stores several readings, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by [`insert`](Self::insert).
    pub fn insert_all(&self, readings: impl IntoIterator<Item = TelemetryReading>) -> Result<()> {
        for reading in readings {
            self.insert(reading)?;
        }
        Ok(())
    }

    /// Returns the number of stored readings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Returns true if no readings are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_id.is_empty()
    }

    /// Returns the number of devices with at least one reading.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.inner.read().by_device.len()
    }

    /// Removes all readings.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_id.clear();
        inner.by_device.clear();
    }
}

impl Clone for InMemoryTelemetryStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl TelemetryStore for InMemoryTelemetryStore {
    fn get_by_id(&self, id: &str) -> Result<TelemetryReading> {
        self.inner
            .read()
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| TelemetryError::NotFound { id: id.to_string() })
    }

    fn recent_by_device(&self, device_id: &str, limit: usize) -> Result<Vec<TelemetryReading>> {
        let inner = self.inner.read();
        let Some(index) = inner.by_device.get(device_id) else {
            return Ok(Vec::new());
        };

        let readings = index
            .iter()
            .rev()
            .take(limit)
            .filter_map(|(_, id)| inner.by_id.get(id).cloned())
            .collect();

        Ok(readings)
    }
}
