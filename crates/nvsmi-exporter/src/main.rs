mod handlers;
mod state;

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use nvsmi_core::collector::{Collector, OutputFormat, ProcessRunner, SmiCommand};
use nvsmi_core::metrics::MetricTable;

use state::AppInner;

// ============================================================
// CLI
// ============================================================

#[derive(Parser, Debug)]
#[command(
    name = "nvsmi-exporter",
    about = "Prometheus exporter for nvidia-smi",
    version = nvsmi_core::VERSION
)]
struct Args {
    /// Address to listen on for telemetry.
    #[arg(long = "telemetry.addr", default_value = "0.0.0.0:9202", env = "NVSMI_LISTEN_ADDRESS")]
    listen: String,

    /// Path under which to expose metrics.
    #[arg(long = "telemetry.path", default_value = "/metrics", env = "NVSMI_METRICS_PATH")]
    metrics_path: String,

    /// Path or name of the nvidia-smi executable.
    #[arg(long = "command.name", default_value = "nvidia-smi", env = "NVSMI_COMMAND")]
    command: String,

    /// Arguments passed to the command, whitespace separated.
    /// Defaults to `-q -x` for xml and to the --query-gpu invocation for csv.
    #[arg(long = "command.flags", env = "NVSMI_COMMAND_FLAGS", allow_hyphen_values = true)]
    flags: Option<String>,

    /// Output format requested from the command: xml or csv.
    #[arg(long = "command.format", default_value = "xml", env = "NVSMI_COMMAND_FORMAT")]
    format: OutputFormat,

    /// Command timeout in seconds when the scrape does not specify one.
    #[arg(
        long = "command.timeout",
        default_value_t = 10,
        env = "NVSMI_COMMAND_TIMEOUT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    /// Start even if the command cannot be executed.
    #[arg(long)]
    skip_command_check: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn smi_command(&self) -> SmiCommand {
        let flags = self
            .flags
            .clone()
            .unwrap_or_else(|| self.format.default_flags());
        SmiCommand::new(&self.command, &flags, self.format)
            .with_timeout(Duration::from_secs(self.timeout))
    }
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    runtime.block_on(async_main(args));
}

async fn async_main(args: Args) {
    let addr: SocketAddr = match args.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(1);
        }
    };

    if let Err(reason) = validate_metrics_path(&args.metrics_path) {
        error!(path = %args.metrics_path, reason, "invalid metrics path");
        process::exit(1);
    }

    let table = match MetricTable::new() {
        Ok(table) => Arc::new(table),
        Err(e) => {
            error!(error = %e, "failed to create metric registry");
            process::exit(1);
        }
    };

    let command = args.smi_command();
    info!(
        version = nvsmi_core::VERSION,
        command = %command.command_line(),
        format = %command.format,
        timeout_secs = args.timeout,
        "starting nvidia-smi exporter"
    );

    let collector = Collector::new(ProcessRunner::new(), command, table);

    if args.skip_command_check {
        info!("command check skipped");
    } else if let Err(e) = collector.probe().await {
        error!(error = %e, "command check failed (use --skip-command-check to start anyway)");
        process::exit(1);
    }

    let app = handlers::router(AppInner::shared(collector, args.metrics_path.clone()));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, path = %args.metrics_path, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        process::exit(1);
    }

    info!("exporter stopped");
}

/// The metrics route must be absolute and must not shadow the fixed routes.
fn validate_metrics_path(path: &str) -> Result<(), &'static str> {
    if !path.starts_with('/') {
        return Err("must start with '/'");
    }
    if path == "/" || path == "/health" {
        return Err("conflicts with a built-in route");
    }
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// Verbosity levels:
/// - `-q`: errors only
/// - default: info
/// - `-v`: debug
/// - `-vv`: trace
///
/// `RUST_LOG` directives are applied on top.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let base = format!("nvsmi_exporter={level},nvsmi_core={level}");
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(extra) if !extra.trim().is_empty() => EnvFilter::new(format!("{base},{extra}")),
        _ => EnvFilter::new(base),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["nvsmi-exporter"]).unwrap();
        assert_eq!(args.listen, "0.0.0.0:9202");
        assert_eq!(args.metrics_path, "/metrics");
        assert_eq!(args.format, OutputFormat::Xml);

        let command = args.smi_command();
        assert_eq!(command.command_line(), "nvidia-smi -q -x");
        assert_eq!(command.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_csv_format_uses_query_flags() {
        let args = Args::try_parse_from(["nvsmi-exporter", "--command.format", "csv"]).unwrap();
        let command = args.smi_command();
        assert_eq!(command.format, OutputFormat::Csv);
        assert!(command.args[0].starts_with("--query-gpu="));
    }

    #[test]
    fn test_explicit_flags_and_timeout() {
        let args = Args::try_parse_from([
            "nvsmi-exporter",
            "--command.name",
            "/opt/nvidia/bin/nvidia-smi",
            "--command.flags",
            "-q -x -i 0",
            "--command.timeout",
            "3",
        ])
        .unwrap();
        let command = args.smi_command();
        assert_eq!(command.command_line(), "/opt/nvidia/bin/nvidia-smi -q -x -i 0");
        assert_eq!(command.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_zero_timeout_and_unknown_format() {
        assert!(Args::try_parse_from(["nvsmi-exporter", "--command.timeout", "0"]).is_err());
        assert!(Args::try_parse_from(["nvsmi-exporter", "--command.format", "json"]).is_err());
    }

    #[test]
    fn test_validate_metrics_path() {
        assert!(validate_metrics_path("/metrics").is_ok());
        assert!(validate_metrics_path("/gpu/metrics").is_ok());
        assert!(validate_metrics_path("metrics").is_err());
        assert!(validate_metrics_path("/").is_err());
        assert!(validate_metrics_path("/health").is_err());
    }
}
