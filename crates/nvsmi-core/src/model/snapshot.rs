//! Snapshot structures for one diagnostic tool dump.
//!
//! Every reading is kept as the raw text the tool printed (for example
//! `"30 %"`, `"1024 MiB"`, `"N/A"`). Numeric interpretation happens later,
//! in `metrics::mapper`, through a single extractor.
//!
//! Field names are mapped onto the element names of the tool's XML dump
//! (`nvidia-smi -q -x`). Every field defaults to empty so that older tool
//! versions that omit an element still deserialize.

use serde::{Deserialize, Serialize};

/// One complete, point-in-time parse of the tool output.
///
/// Source: `<nvidia_smi_log>` root element
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct SystemSnapshot {
    /// Driver version string.
    /// Source: `<driver_version>`
    pub driver_version: String,

    /// Number of attached devices as printed by the tool.
    /// Source: `<attached_gpus>`
    pub attached_gpus: String,

    /// Devices in tool order. The position is the device's `gpu` label.
    /// Source: repeated `<gpu>` elements
    #[serde(rename = "gpu")]
    pub gpus: Vec<DeviceSnapshot>,
}

/// Readings for a single device.
///
/// Source: `<gpu id="...">`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct DeviceSnapshot {
    /// Source: `<product_name>`
    pub product_name: String,

    /// Source: `<uuid>`
    pub uuid: String,

    /// Missing on some older tool versions.
    /// Source: `<vbios_version>`
    pub vbios_version: String,

    /// Percent with unit suffix, `"N/A"` on passively cooled cards.
    /// Source: `<fan_speed>`
    pub fan_speed: String,

    /// Source: `<fb_memory_usage>`
    #[serde(rename = "fb_memory_usage")]
    pub memory: MemoryUsage,

    /// Source: `<utilization>`
    pub utilization: Utilization,

    /// Source: `<temperature>`
    pub temperature: Temperature,

    /// Source: `<power_readings>` (`<gpu_power_readings>` on newer drivers)
    #[serde(rename = "power_readings", alias = "gpu_power_readings")]
    pub power: PowerReadings,

    /// Current clock speeds.
    /// Source: `<clocks>`
    pub clocks: Clocks,

    /// Maximum clock speeds.
    /// Source: `<max_clocks>`
    pub max_clocks: Clocks,
}

/// Frame buffer memory usage, in MiB with a unit suffix.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct MemoryUsage {
    pub total: String,
    pub used: String,
    pub free: String,
}

/// Utilization percentages.
///
/// `encoder` and `decoder` are absent on older tool versions.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Utilization {
    #[serde(rename = "gpu_util")]
    pub gpu: String,
    #[serde(rename = "memory_util")]
    pub memory: String,
    #[serde(rename = "encoder_util")]
    pub encoder: String,
    #[serde(rename = "decoder_util")]
    pub decoder: String,
}

/// Temperatures in degrees Celsius with a `C` suffix.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Temperature {
    #[serde(rename = "gpu_temp")]
    pub current: String,
    #[serde(rename = "gpu_temp_max_threshold")]
    pub max_threshold: String,
    #[serde(rename = "gpu_temp_slow_threshold")]
    pub slow_threshold: String,
}

/// Power readings in watts with a `W` suffix.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct PowerReadings {
    #[serde(rename = "power_draw")]
    pub draw: String,
    #[serde(rename = "power_limit", alias = "current_power_limit")]
    pub limit: String,
}

/// Clock speeds in MHz with a unit suffix.
///
/// Used for both `<clocks>` and `<max_clocks>`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Clocks {
    #[serde(rename = "graphics_clock")]
    pub graphics: String,
    #[serde(rename = "sm_clock")]
    pub sm: String,
    #[serde(rename = "mem_clock")]
    pub memory: String,
    #[serde(rename = "video_clock")]
    pub video: String,
}

impl SystemSnapshot {
    /// Number of device records in this snapshot.
    pub fn device_count(&self) -> usize {
        self.gpus.len()
    }
}
