//! nvsmi-core: shared library for the nvsmi exporter.
//!
//! Provides:
//! - `collector`: runs the diagnostic tool, parses its dump and drives a refresh cycle
//! - `model`: typed snapshot of one tool dump (raw text fields)
//! - `metrics`: the labeled metric table and the snapshot-to-metric mapper

pub mod collector;
pub mod metrics;
pub mod model;

/// Crate version with the git revision it was built from.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("NVSMI_GIT_SHA"));
