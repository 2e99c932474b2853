//! Recent-history windows for the repeat operator.
//!
//! A window is the `limit` most recent readings of one device, ordered by
//! sequence number descending. Whether the window is free of sequence gaps is
//! not checked: readings 10, 8, 7 count as three consecutive occurrences.

use std::fmt;
use std::sync::Arc;

use mop_telemetry::{TelemetryReading, TelemetryStore};
use tracing::debug;

use crate::error::Result;

/// Supplies the recent readings of a device.
pub trait HistoryResolver: Send + Sync + fmt::Debug {
    /// Returns at most `limit` readings of `device_id`, newest first by sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn recent_readings(&self, device_id: &str, limit: usize) -> Result<Vec<TelemetryReading>>;
}

/// A [`HistoryResolver`] backed by a [`TelemetryStore`].
///
/// Re-sorts and truncates whatever the store returns so callers can rely on
/// the window ordering even if the store is sloppy about it.
#[derive(Debug, Clone)]
pub struct StoreHistory {
    store: Arc<dyn TelemetryStore>,
}

impl StoreHistory {
    /// Creates a resolver over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }
}

impl HistoryResolver for StoreHistory {
    fn recent_readings(&self, device_id: &str, limit: usize) -> Result<Vec<TelemetryReading>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut readings = self.store.recent_by_device(device_id, limit)?;

        let ordered = readings.windows(2).all(|pair| pair[0].seq >= pair[1].seq);
        if !ordered || readings.len() > limit {
            debug!(
                device_id = %device_id,
                returned = readings.len(),
                limit,
                "telemetry store returned an unordered or oversized window"
            );
            readings.sort_by(|a, b| b.seq.cmp(&a.seq));
            readings.truncate(limit);
        }

        Ok(readings)
    }
}
