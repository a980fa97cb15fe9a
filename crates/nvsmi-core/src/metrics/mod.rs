//! Metric table and snapshot mapping.

pub mod mapper;
pub mod table;

pub use mapper::{MapStats, apply};
pub use table::{Family, MetricTable, TableWriter};
