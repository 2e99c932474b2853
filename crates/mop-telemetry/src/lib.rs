//! Device telemetry readings for the Mopsync alerting pipeline.
//!
//! `mop-telemetry` defines the [`TelemetryReading`] a device produces for each
//! stored sample, and the [`TelemetryStore`] contract the rule engine reads
//! readings through. Storage technology is not this crate's concern; the
//! bundled [`InMemoryTelemetryStore`] backs tests and the fixture-driven worker.
//!
//! # Example
//!
//! ```rust
//! use mop_telemetry::{InMemoryTelemetryStore, TelemetryReading, TelemetryStore};
//!
//! let store = InMemoryTelemetryStore::new();
//!
//! let reading = TelemetryReading::builder("device-1", 1)
//!     .id("reading-1")
//!     .metric("temperature", 30.0)
//!     .build();
//! store.insert(reading).unwrap();
//!
//! let latest = store.recent_by_device("device-1", 1).unwrap();
//! assert_eq!(latest[0].id, "reading-1");
//! ```

#![forbid(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/mop-telemetry/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod storage;
pub mod types;

// Re-export main types at crate root
pub use error::{Result, TelemetryError};
pub use storage::{InMemoryTelemetryStore, TelemetryStore};
pub use types::{TelemetryReading, TelemetryReadingBuilder};
