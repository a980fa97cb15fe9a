//! Data model for parsed diagnostic tool output.

pub mod snapshot;

pub use snapshot::{
    Clocks, DeviceSnapshot, MemoryUsage, PowerReadings, SystemSnapshot, Temperature, Utilization,
};
