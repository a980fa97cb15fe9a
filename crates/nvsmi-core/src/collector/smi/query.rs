//! Parser for `nvidia-smi --query-gpu=... --format=csv,noheader,nounits`.
//!
//! The query names a fixed list of columns ([`QUERY_FIELDS`]); each output
//! row is one device, in index order. Readings the query interface cannot
//! express (encoder/decoder utilization, temperature thresholds) stay empty.

use super::{ParseError, ensure_complete};
use crate::model::{DeviceSnapshot, SystemSnapshot};

/// Columns requested from the tool, in output order.
pub const QUERY_FIELDS: &[&str] = &[
    "driver_version",
    "name",
    "uuid",
    "vbios_version",
    "fan.speed",
    "memory.total",
    "memory.used",
    "memory.free",
    "utilization.gpu",
    "utilization.memory",
    "temperature.gpu",
    "power.draw",
    "power.limit",
    "clocks.gr",
    "clocks.sm",
    "clocks.mem",
    "clocks.video",
    "clocks.max.gr",
    "clocks.max.sm",
    "clocks.max.mem",
    "clocks.max.video",
];

/// Tool arguments matching [`QUERY_FIELDS`].
pub fn query_flags() -> String {
    format!(
        "--query-gpu={} --format=csv,noheader,nounits",
        QUERY_FIELDS.join(",")
    )
}

/// Parses CSV query output into a snapshot.
///
/// The driver version is taken from the first row; `attached_gpus` is the
/// number of rows.
pub fn parse_csv(raw: &[u8]) -> Result<SystemSnapshot, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(raw);

    let mut snapshot = SystemSnapshot::default();

    for (row, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| ParseError::Malformed(format!("invalid CSV at row {}: {}", row, e)))?;

        if record.len() != QUERY_FIELDS.len() {
            return Err(ParseError::Malformed(format!(
                "row {} has {} columns, expected {}",
                row,
                record.len(),
                QUERY_FIELDS.len()
            )));
        }

        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();

        if row == 0 {
            snapshot.driver_version = field(0);
        }

        let mut device = DeviceSnapshot {
            product_name: field(1),
            uuid: field(2),
            vbios_version: field(3),
            fan_speed: field(4),
            ..Default::default()
        };
        device.memory.total = field(5);
        device.memory.used = field(6);
        device.memory.free = field(7);
        device.utilization.gpu = field(8);
        device.utilization.memory = field(9);
        device.temperature.current = field(10);
        device.power.draw = field(11);
        device.power.limit = field(12);
        device.clocks.graphics = field(13);
        device.clocks.sm = field(14);
        device.clocks.memory = field(15);
        device.clocks.video = field(16);
        device.max_clocks.graphics = field(17);
        device.max_clocks.sm = field(18);
        device.max_clocks.memory = field(19);
        device.max_clocks.video = field(20);

        snapshot.gpus.push(device);
    }

    if snapshot.gpus.is_empty() {
        return Err(ParseError::Malformed("no CSV rows".to_string()));
    }

    snapshot.attached_gpus = snapshot.gpus.len().to_string();
    ensure_complete(snapshot)
}
