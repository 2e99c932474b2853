//! Notification worker for the Mopsync rule engine.
//!
//! The worker receives `{"deviceDataId": "..."}` notifications, one per line,
//! and runs [`mop_rules::RuleProcessor::process_telemetry`] for each. Stores
//! are seeded from a fixture file in place of the external document database.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fixtures;
pub mod listener;
pub mod logging;
pub mod runtime;

use std::sync::Arc;

use mop_rules::{InMemoryAlertSink, InMemoryRuleStore, RuleProcessor};
use mop_telemetry::InMemoryTelemetryStore;

pub use config::{LogConfig, LogFormat, WorkerConfig};
pub use dispatch::{DispatchStats, Dispatcher};
pub use error::{Result, WorkerError};
pub use fixtures::{Fixtures, RuleProblem};
pub use listener::{DeviceDataNotification, ListenerOutcome, NotificationListener};

/// The in-memory stores and the processor wired over them.
#[derive(Debug, Clone)]
pub struct Engine {
    /// Telemetry readings.
    pub telemetry: InMemoryTelemetryStore,
    /// Alerting rules.
    pub rules: InMemoryRuleStore,
    /// Recorded alerts.
    pub alerts: InMemoryAlertSink,
    /// Processor over the three stores.
    pub processor: RuleProcessor,
}

impl Engine {
    /// Creates an engine with empty stores.
    #[must_use]
    pub fn new() -> Self {
        let telemetry = InMemoryTelemetryStore::new();
        let rules = InMemoryRuleStore::new();
        let alerts = InMemoryAlertSink::new();
        let processor = RuleProcessor::new(
            Arc::new(telemetry.clone()),
            Arc::new(rules.clone()),
            Arc::new(alerts.clone()),
        );
        Self {
            telemetry,
            rules,
            alerts,
            processor,
        }
    }

    /// Creates an engine seeded from `fixtures`.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate rule or reading IDs.
    pub fn from_fixtures(fixtures: &Fixtures) -> Result<Self> {
        let engine = Self::new();
        fixtures.seed(&engine.rules, &engine.telemetry)?;
        Ok(engine)
    }

    /// Returns a listener feeding this engine's processor.
    #[must_use]
    pub fn listener(&self) -> NotificationListener {
        NotificationListener::new(self.processor.clone())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
