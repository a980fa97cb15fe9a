//! GPU metrics collector built on the `nvidia-smi` diagnostic tool.
//!
//! Each refresh cycle runs the tool once, parses its dump into a
//! [`SystemSnapshot`](crate::model::SystemSnapshot) and maps the snapshot
//! into the shared [`MetricTable`](crate::metrics::MetricTable).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Collector                           │
//! │   in-flight guard ─► run ─► parse ─► map (one table batch)   │
//! │          │                    │               │              │
//! │   ┌──────▼────────┐   ┌───────▼───────┐   ┌───▼──────────┐   │
//! │   │ CommandRunner │   │ smi::parse    │   │ metrics::    │   │
//! │   │   (trait)     │   │  - XML (-q -x)│   │   mapper     │   │
//! │   └──────┬────────┘   │  - CSV query  │   └──────────────┘   │
//! │          │            └───────────────┘                      │
//! └──────────┼───────────────────────────────────────────────────┘
//!            │
//!     ┌──────┴────────┬────────────────┐
//!     │               │                │
//! ┌───▼──────────┐ ┌──▼─────────┐ ┌────▼───────┐
//! │ ProcessRunner│ │ MockRunner │ │ Scenarios  │
//! │ (child proc) │ │ (Testing)  │ │ (Fixtures) │
//! └──────────────┘ └────────────┘ └────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use nvsmi_core::collector::{Collector, MockRunner, SmiCommand};
//! use nvsmi_core::metrics::MetricTable;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let table = Arc::new(MetricTable::new().unwrap());
//! let collector = Collector::new(MockRunner::two_gpus(), SmiCommand::default(), table);
//! let report = collector.collect().await.unwrap();
//! assert_eq!(report.devices, 2);
//! # });
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod error;
pub mod mock;
pub mod smi;
pub mod traits;

pub use collector::{Collector, CycleOutcome, CycleReport};
pub use error::CollectError;
pub use mock::MockRunner;
pub use smi::{OutputFormat, ParseError, SmiCommand};
pub use traits::{CommandRunner, ProcessRunner, RunError};
