use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;

use nvsmi_core::collector::OutputFormat;
use nvsmi_core::collector::smi;
use nvsmi_core::metrics::{MetricTable, mapper};
use nvsmi_core::model::SystemSnapshot;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "nvsmi-dump",
    about = "Inspect a saved nvidia-smi dump",
    version = nvsmi_core::VERSION
)]
struct Cli {
    /// Dump file; reads stdin when omitted or `-`
    path: Option<PathBuf>,

    /// Format of the dump: xml (`nvidia-smi -q -x`) or csv (`--query-gpu`)
    #[arg(long, default_value = "xml")]
    format: OutputFormat,

    /// Print the metrics exposition instead of the parsed snapshot
    #[arg(long)]
    metrics: bool,
}

#[derive(Serialize)]
struct DumpReport<'a> {
    format: String,
    devices: usize,
    snapshot: &'a SystemSnapshot,
}

fn main() {
    let cli = Cli::parse();

    let raw = match read_input(cli.path.as_deref()) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Failed to read input: {}", e);
            std::process::exit(1);
        }
    };

    match render(&cli, &raw) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn read_input(path: Option<&Path>) -> io::Result<Vec<u8>> {
    match path {
        Some(p) if p != Path::new("-") => fs::read(p),
        _ => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn render(cli: &Cli, raw: &[u8]) -> Result<String, String> {
    let snapshot = smi::parse(cli.format, raw).map_err(|e| e.to_string())?;

    if cli.metrics {
        let table = MetricTable::new().map_err(|e| format!("metric registry: {}", e))?;
        mapper::apply(&snapshot, &table);
        table.set_collector_success(true);
        return table.render().map_err(|e| format!("encoding: {}", e));
    }

    let report = DumpReport {
        format: cli.format.to_string(),
        devices: snapshot.device_count(),
        snapshot: &snapshot,
    };
    serde_json::to_string_pretty(&report).map_err(|e| format!("serialization: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvsmi_core::collector::mock::scenarios::{TWO_GPUS_CSV, TWO_GPUS_XML};

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nvsmi-dump").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_render_json() {
        let out = render(&cli(&[]), TWO_GPUS_XML.as_bytes()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["format"], "xml");
        assert_eq!(value["devices"], 2);
        assert_eq!(value["snapshot"]["driver_version"], "470.10");
        assert_eq!(value["snapshot"]["gpu"][0]["fan_speed"], "30 %");
    }

    #[test]
    fn test_render_metrics_from_csv() {
        let out = render(&cli(&["--format", "csv", "--metrics"]), TWO_GPUS_CSV.as_bytes()).unwrap();

        assert!(out.contains("nvidia_device_count 2"));
        assert!(out.contains("nvidia_smi_collector_success 1"));
        assert!(out.contains("nvidia_clock_max_mhz{gpu=\"0\",part=\"video\"} 1950"));
    }

    #[test]
    fn test_render_parse_failure() {
        let err = render(&cli(&[]), b"<html></html>").unwrap_err();
        assert!(err.contains("malformed output"));
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.xml");
        fs::write(&path, TWO_GPUS_XML).unwrap();

        let raw = read_input(Some(&path)).unwrap();
        assert_eq!(raw, TWO_GPUS_XML.as_bytes());

        fs::remove_file(&path).unwrap();
        assert!(read_input(Some(&path)).is_err());
    }
}
