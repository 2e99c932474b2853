//! Rule evaluation and alerting for Mopsync device telemetry.
//!
//! `mop-rules` decides, for each stored telemetry reading, which rules bound to
//! the reading's metrics hold, and records one alert per satisfied rule.
//!
//! # Rules
//!
//! A rule's content is a small tree: comparison leaves (`gt`, `lt`, `gte`,
//! `lte`, `eq`) against a literal threshold, and a `repeat` node that requires
//! its inner predicate to hold for the device's N most recent readings.
//! Content that fails to parse never raises an error during evaluation; it
//! simply never matches.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use mop_rules::{InMemoryAlertSink, InMemoryRuleStore, Rule, RuleProcessor, RuleStore};
//! use mop_telemetry::{InMemoryTelemetryStore, TelemetryReading};
//! use serde_json::json;
//!
//! let telemetry = InMemoryTelemetryStore::new();
//! telemetry
//!     .insert(
//!         TelemetryReading::builder("d1", 1)
//!             .id("t1")
//!             .metric("temperature", 30.0)
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let rules = InMemoryRuleStore::new();
//! rules
//!     .insert(Rule::from_content(
//!         "too-hot",
//!         "d1",
//!         "temperature",
//!         &json!({"type": "gt", "value": 25.0}),
//!     ))
//!     .unwrap();
//!
//! let alerts = InMemoryAlertSink::new();
//! let processor = RuleProcessor::new(
//!     Arc::new(telemetry),
//!     Arc::new(rules),
//!     Arc::new(alerts.clone()),
//! );
//!
//! let report = processor.process_telemetry("t1").unwrap();
//! assert_eq!(report.rules_matched, 1);
//! assert_eq!(alerts.for_rule("too-hot").len(), 1);
//! ```

#![forbid(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/mop-rules/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod alert;
pub mod comparator;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod processor;
pub mod rule;
pub mod service;
pub mod store;
pub mod value;

// Re-export main types at crate root
pub use alert::{Alert, AlertSink, InMemoryAlertSink};
pub use comparator::{EQ_EPSILON, compare};
pub use error::{Result, RuleError};
pub use evaluator::Evaluator;
pub use history::{HistoryResolver, StoreHistory};
pub use processor::{ProcessingReport, RuleProcessor};
pub use rule::{ComparisonOperator, InvalidReason, REPEAT_TYPE, Rule, RuleNode};
pub use service::{RuleRequest, RuleService};
pub use store::{InMemoryRuleStore, RuleFilter, RuleStore};
pub use value::{MetricValue, Unsupported};
