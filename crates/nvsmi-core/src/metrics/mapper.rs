//! Snapshot to metric table mapping.
//!
//! Every numeric reading goes through `collector::smi::value`. A reading that
//! does not yield a number (`"N/A"`, `"[Not Supported]"`, missing element) is
//! skipped: the series keeps whatever value it had before, or stays absent.
//!
//! The `gpu` label is the device's position in the snapshot.

use tracing::{debug, warn};

use super::table::{Family, MetricTable, TableWriter};
use crate::collector::smi::value::{extract_mib_as_bytes, extract_number, extract_ratio};
use crate::model::{Clocks, DeviceSnapshot, SystemSnapshot};

/// Outcome of mapping one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapStats {
    pub devices: usize,
    /// Readings that did not yield a number (absent or non-numeric).
    pub skipped: usize,
}

/// Maps `snapshot` into `table` in a single write batch.
pub fn apply(snapshot: &SystemSnapshot, table: &MetricTable) -> MapStats {
    let mut writer = table.writer();
    write_snapshot(snapshot, &mut writer)
}

/// Maps `snapshot` through an already open write batch.
pub fn write_snapshot(snapshot: &SystemSnapshot, writer: &mut TableWriter<'_>) -> MapStats {
    let mut mapper = Mapper {
        writer,
        skipped: 0,
    };

    mapper
        .writer
        .set(Family::DriverInfo, &[snapshot.driver_version.trim()], 1.0);

    let listed = snapshot.device_count();
    let count = match extract_number(&snapshot.attached_gpus) {
        Some(reported) => {
            if reported != listed as f64 {
                warn!(
                    attached_gpus = %snapshot.attached_gpus,
                    listed,
                    "attached device count differs from device records"
                );
            }
            reported
        }
        None => listed as f64,
    };
    mapper.writer.set(Family::DeviceCount, &[], count);

    for (index, device) in snapshot.gpus.iter().enumerate() {
        mapper.device(&index.to_string(), device);
    }

    MapStats {
        devices: listed,
        skipped: mapper.skipped,
    }
}

struct Mapper<'w, 'a> {
    writer: &'w mut TableWriter<'a>,
    skipped: usize,
}

impl Mapper<'_, '_> {
    fn device(&mut self, gpu: &str, device: &DeviceSnapshot) {
        self.writer.set(
            Family::Info,
            &[
                gpu,
                device.product_name.trim(),
                device.uuid.trim(),
                device.vbios_version.trim(),
            ],
            1.0,
        );

        self.reading(Family::FanSpeed, &[gpu], "fan_speed", &device.fan_speed, extract_ratio);

        let memory = &device.memory;
        self.reading(Family::MemoryTotal, &[gpu], "memory.total", &memory.total, extract_mib_as_bytes);
        self.reading(Family::Memory, &[gpu, "used"], "memory.used", &memory.used, extract_mib_as_bytes);
        self.reading(Family::Memory, &[gpu, "free"], "memory.free", &memory.free, extract_mib_as_bytes);

        let util = &device.utilization;
        for (part, raw) in [
            ("graphics", &util.gpu),
            ("memory", &util.memory),
            ("encoder", &util.encoder),
            ("decoder", &util.decoder),
        ] {
            self.reading(Family::Utilization, &[gpu, part], "utilization", raw, extract_ratio);
        }

        let temp = &device.temperature;
        self.reading(Family::Temperature, &[gpu], "temperature", &temp.current, extract_number);
        self.reading(
            Family::TemperatureMaxThreshold,
            &[gpu],
            "temperature.max_threshold",
            &temp.max_threshold,
            extract_number,
        );
        self.reading(
            Family::TemperatureSlowThreshold,
            &[gpu],
            "temperature.slow_threshold",
            &temp.slow_threshold,
            extract_number,
        );

        self.reading(Family::PowerDraw, &[gpu], "power.draw", &device.power.draw, extract_number);
        self.reading(Family::PowerLimit, &[gpu], "power.limit", &device.power.limit, extract_number);

        self.clocks(Family::Clock, gpu, &device.clocks);
        self.clocks(Family::ClockMax, gpu, &device.max_clocks);
    }

    fn clocks(&mut self, family: Family, gpu: &str, clocks: &Clocks) {
        for (part, raw) in [
            ("graphics", &clocks.graphics),
            ("sm", &clocks.sm),
            ("memory", &clocks.memory),
            ("video", &clocks.video),
        ] {
            self.reading(family, &[gpu, part], family.name(), raw, extract_number);
        }
    }

    fn reading(
        &mut self,
        family: Family,
        labels: &[&str],
        field: &str,
        raw: &str,
        convert: fn(&str) -> Option<f64>,
    ) {
        match convert(raw) {
            Some(value) => self.writer.set(family, labels, value),
            None => {
                self.skipped += 1;
                debug!(gpu = labels[0], field, raw, "skipping non-numeric reading");
            }
        }
    }
}
