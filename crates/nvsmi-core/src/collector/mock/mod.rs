//! Test doubles for the command runner.
//!
//! `MockRunner` replays canned tool output so the collector, mapper and
//! HTTP layer can be exercised on machines without a GPU.

mod runner;
pub mod scenarios;

pub use runner::MockRunner;
