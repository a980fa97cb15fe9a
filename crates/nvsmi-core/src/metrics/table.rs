//! Labeled metric table read by the exposition encoder.
//!
//! The table owns a private `prometheus::Registry` with one gauge family per
//! [`Family`]. Writers take a [`TableWriter`] (an exclusive batch); readers
//! (`render`, `value`, `series`) take a shared lock, so a scrape never sees
//! a half-applied snapshot.
//!
//! Entries are upserted and never removed. A device that disappears keeps
//! its last values until it is overwritten or the process restarts; the same
//! holds for `nvidia_info` and `nvidia_driver_info` series whose label values
//! change (renamed device, driver upgrade).

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

/// Gauge families published by the exporter.
///
/// Names and label schemas are the wire contract with dashboards and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    DriverInfo,
    DeviceCount,
    Info,
    FanSpeed,
    MemoryTotal,
    Memory,
    Utilization,
    Temperature,
    TemperatureMaxThreshold,
    TemperatureSlowThreshold,
    PowerDraw,
    PowerLimit,
    Clock,
    ClockMax,
    CollectorSuccess,
    CollectorDuration,
    BuildInfo,
}

impl Family {
    pub const ALL: [Family; 17] = [
        Family::DriverInfo,
        Family::DeviceCount,
        Family::Info,
        Family::FanSpeed,
        Family::MemoryTotal,
        Family::Memory,
        Family::Utilization,
        Family::Temperature,
        Family::TemperatureMaxThreshold,
        Family::TemperatureSlowThreshold,
        Family::PowerDraw,
        Family::PowerLimit,
        Family::Clock,
        Family::ClockMax,
        Family::CollectorSuccess,
        Family::CollectorDuration,
        Family::BuildInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::DriverInfo => "nvidia_driver_info",
            Family::DeviceCount => "nvidia_device_count",
            Family::Info => "nvidia_info",
            Family::FanSpeed => "nvidia_fan_speed_ratio",
            Family::MemoryTotal => "nvidia_memory_total_bytes",
            Family::Memory => "nvidia_memory_bytes",
            Family::Utilization => "nvidia_utilization_ratio",
            Family::Temperature => "nvidia_temperature_celsius",
            Family::TemperatureMaxThreshold => "nvidia_temperature_max_threshold_celsius",
            Family::TemperatureSlowThreshold => "nvidia_temperature_slow_threshold_celsius",
            Family::PowerDraw => "nvidia_power_draw_watts",
            Family::PowerLimit => "nvidia_power_limit_watts",
            Family::Clock => "nvidia_clock_mhz",
            Family::ClockMax => "nvidia_clock_max_mhz",
            Family::CollectorSuccess => "nvidia_smi_collector_success",
            Family::CollectorDuration => "nvidia_smi_collector_duration_seconds",
            Family::BuildInfo => "nvidia_smi_exporter_build_info",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Family::DriverInfo => "NVIDIA driver information.",
            Family::DeviceCount => "Number of GPUs attached to the machine.",
            Family::Info => "GPU identity; value is always 1.",
            Family::FanSpeed => "Fan speed as a ratio of its maximum.",
            Family::MemoryTotal => "Total frame buffer memory in bytes.",
            Family::Memory => "Frame buffer memory in bytes by state.",
            Family::Utilization => {
                "Ratio of the sample period during which a GPU part was busy."
            }
            Family::Temperature => "Current GPU core temperature in degrees Celsius.",
            Family::TemperatureMaxThreshold => {
                "Temperature at which the GPU shuts down, in degrees Celsius."
            }
            Family::TemperatureSlowThreshold => {
                "Temperature at which the GPU starts throttling, in degrees Celsius."
            }
            Family::PowerDraw => "Current power draw in watts.",
            Family::PowerLimit => "Software power limit in watts.",
            Family::Clock => "Current clock speed in MHz.",
            Family::ClockMax => "Maximum clock speed in MHz.",
            Family::CollectorSuccess => "Whether the last collection cycle succeeded (1) or not (0).",
            Family::CollectorDuration => "Duration of the last successful collection cycle in seconds.",
            Family::BuildInfo => "Exporter build information.",
        }
    }

    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            Family::DriverInfo | Family::BuildInfo => &["version"],
            Family::DeviceCount | Family::CollectorSuccess | Family::CollectorDuration => &[],
            Family::Info => &["gpu", "name", "uuid", "vbios_version"],
            Family::Memory => &["gpu", "state"],
            Family::Utilization | Family::Clock | Family::ClockMax => &["gpu", "part"],
            Family::FanSpeed
            | Family::MemoryTotal
            | Family::Temperature
            | Family::TemperatureMaxThreshold
            | Family::TemperatureSlowThreshold
            | Family::PowerDraw
            | Family::PowerLimit => &["gpu"],
        }
    }
}

enum Slot {
    Labeled(GaugeVec),
    Plain(Gauge),
}

/// Process-wide metric table, shared by `Arc` between collector and transport.
pub struct MetricTable {
    registry: Registry,
    slots: HashMap<Family, Slot>,
    lock: RwLock<()>,
}

impl MetricTable {
    /// Creates a table with every family registered and the build info set.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let mut slots = HashMap::with_capacity(Family::ALL.len());

        for family in Family::ALL {
            let opts = Opts::new(family.name(), family.help());
            let slot = if family.label_names().is_empty() {
                let gauge = Gauge::with_opts(opts)?;
                registry.register(Box::new(gauge.clone()))?;
                Slot::Plain(gauge)
            } else {
                let vec = GaugeVec::new(opts, family.label_names())?;
                registry.register(Box::new(vec.clone()))?;
                Slot::Labeled(vec)
            };
            slots.insert(family, slot);
        }

        let table = Self {
            registry,
            slots,
            lock: RwLock::new(()),
        };
        table.writer().set(Family::BuildInfo, &[crate::VERSION], 1.0);
        Ok(table)
    }

    /// Starts an exclusive write batch. Readers wait until it is dropped.
    pub fn writer(&self) -> TableWriter<'_> {
        TableWriter {
            _guard: self.lock.write().unwrap_or_else(PoisonError::into_inner),
            slots: &self.slots,
        }
    }

    /// Writes the success flag in its own batch.
    pub fn set_collector_success(&self, success: bool) {
        self.writer().set_collector_success(success);
    }

    fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consistent copy of all families that have at least one series.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let _guard = self.read();
        self.registry.gather()
    }

    /// Renders the table in the Prometheus text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        let families = self.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type of [`render`](Self::render) output.
    pub fn format_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Current value of one series, matched on the full label set.
    pub fn value(&self, family: Family, labels: &[(&str, &str)]) -> Option<f64> {
        self.series(family).into_iter().find_map(|(set, value)| {
            let matches = set.len() == labels.len()
                && labels
                    .iter()
                    .all(|(k, v)| set.get(*k).is_some_and(|have| have == v));
            matches.then_some(value)
        })
    }

    /// All series of one family as (label set, value) pairs.
    pub fn series(&self, family: Family) -> Vec<(BTreeMap<String, String>, f64)> {
        self.gather()
            .iter()
            .filter(|mf| mf.get_name() == family.name())
            .flat_map(|mf| mf.get_metric().iter())
            .map(|m| {
                let labels = m
                    .get_label()
                    .iter()
                    .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
                    .collect();
                (labels, m.get_gauge().get_value())
            })
            .collect()
    }
}

/// Exclusive write batch over a [`MetricTable`].
pub struct TableWriter<'a> {
    _guard: RwLockWriteGuard<'a, ()>,
    slots: &'a HashMap<Family, Slot>,
}

impl TableWriter<'_> {
    /// Upserts one series. `labels` are values in `family.label_names()` order.
    pub fn set(&mut self, family: Family, labels: &[&str], value: f64) {
        match self.slots.get(&family) {
            Some(Slot::Labeled(vec)) => match vec.get_metric_with_label_values(labels) {
                Ok(gauge) => gauge.set(value),
                Err(e) => warn!(metric = family.name(), error = %e, "label mismatch"),
            },
            Some(Slot::Plain(gauge)) if labels.is_empty() => gauge.set(value),
            Some(Slot::Plain(_)) => {
                warn!(metric = family.name(), "labels given for an unlabeled metric")
            }
            None => warn!(metric = family.name(), "metric family not registered"),
        }
    }

    pub fn set_collector_success(&mut self, success: bool) {
        self.set(Family::CollectorSuccess, &[], if success { 1.0 } else { 0.0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_reports_failure_until_first_success() {
        let table = MetricTable::new().unwrap();
        assert_eq!(table.value(Family::CollectorSuccess, &[]), Some(0.0));
        assert_eq!(
            table.value(Family::BuildInfo, &[("version", crate::VERSION)]),
            Some(1.0)
        );
    }

    #[test]
    fn test_families_have_unique_names() {
        let mut names: Vec<&str> = Family::ALL.iter().map(|f| f.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Family::ALL.len());
    }

    #[test]
    fn test_set_and_read_labeled_value() {
        let table = MetricTable::new().unwrap();
        table.writer().set(Family::Clock, &["0", "sm"], 1695.0);

        assert_eq!(
            table.value(Family::Clock, &[("gpu", "0"), ("part", "sm")]),
            Some(1695.0)
        );
        assert_eq!(table.value(Family::Clock, &[("gpu", "0"), ("part", "video")]), None);
        assert_eq!(table.value(Family::Clock, &[("gpu", "0")]), None);
    }

    #[test]
    fn test_set_is_an_upsert() {
        let table = MetricTable::new().unwrap();
        {
            let mut w = table.writer();
            w.set(Family::Temperature, &["0"], 60.0);
            w.set(Family::Temperature, &["0"], 61.0);
        }
        assert_eq!(table.series(Family::Temperature).len(), 1);
        assert_eq!(table.value(Family::Temperature, &[("gpu", "0")]), Some(61.0));
    }

    #[test]
    fn test_wrong_label_count_is_ignored() {
        let table = MetricTable::new().unwrap();
        {
            let mut w = table.writer();
            w.set(Family::Temperature, &["0", "extra"], 60.0);
            w.set(Family::DeviceCount, &["0"], 2.0);
        }
        assert!(table.series(Family::Temperature).is_empty());
        assert_eq!(table.value(Family::DeviceCount, &[]), Some(0.0));
    }

    #[test]
    fn test_render_exposition_text() {
        let table = MetricTable::new().unwrap();
        {
            let mut w = table.writer();
            w.set(Family::Utilization, &["1", "graphics"], 0.87);
            w.set_collector_success(true);
        }
        let text = table.render().unwrap();

        assert!(text.contains("# TYPE nvidia_utilization_ratio gauge"));
        assert!(text.contains("nvidia_utilization_ratio{gpu=\"1\",part=\"graphics\"} 0.87"));
        assert!(text.contains("nvidia_smi_collector_success 1"));
        assert!(table.format_type().starts_with("text/plain"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let table = MetricTable::new().unwrap();
        table
            .writer()
            .set(Family::Info, &["0", "Quadro \"P\"", "GPU-1", ""], 1.0);
        let text = table.render().unwrap();
        assert!(text.contains("name=\"Quadro \\\"P\\\"\""));
    }
}
