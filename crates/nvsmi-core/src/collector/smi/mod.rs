//! Invocation and parsing of the `nvidia-smi` diagnostic tool.
//!
//! The tool can be asked for a full XML dump (`-q -x`, the default) or for a
//! CSV query. Both are parsed into the same [`SystemSnapshot`].

pub mod parser;
pub mod query;
pub mod value;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::model::SystemSnapshot;

/// Default execution timeout, mirroring the usual scrape timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default tool name, resolved through `PATH`.
pub const DEFAULT_PROGRAM: &str = "nvidia-smi";

/// Arguments for the full XML dump.
pub const XML_FLAGS: &str = "-q -x";

/// Output format requested from the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Xml,
    Csv,
}

impl OutputFormat {
    /// Arguments used when none are configured.
    pub fn default_flags(self) -> String {
        match self {
            OutputFormat::Xml => XML_FLAGS.to_string(),
            OutputFormat::Csv => query::query_flags(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Xml => write!(f, "xml"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(OutputFormat::Xml),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}', expected xml or csv", other)),
        }
    }
}

/// How to run the diagnostic tool.
#[derive(Debug, Clone, PartialEq)]
pub struct SmiCommand {
    pub program: String,
    pub args: Vec<String>,
    pub format: OutputFormat,
    /// Used when the caller does not supply a per-cycle timeout.
    pub timeout: Duration,
}

impl SmiCommand {
    /// Creates a command from a program path and a whitespace-separated flag string.
    pub fn new(program: impl Into<String>, flags: &str, format: OutputFormat) -> Self {
        Self {
            program: program.into(),
            args: flags.split_whitespace().map(str::to_string).collect(),
            format,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line as it would be typed, for logs and the index page.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for SmiCommand {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM, XML_FLAGS, OutputFormat::Xml)
    }
}

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Not a well-formed document of the expected shape.
    #[error("malformed output: {0}")]
    Malformed(String),
    /// Well-formed, but without the content a real reading has.
    #[error("incomplete data: {0}")]
    Incomplete(String),
}

/// Parses raw tool output in the given format.
pub fn parse(format: OutputFormat, raw: &[u8]) -> Result<SystemSnapshot, ParseError> {
    match format {
        OutputFormat::Xml => parser::parse_xml(raw),
        OutputFormat::Csv => query::parse_csv(raw),
    }
}

/// Post-parse check shared by both formats.
pub(crate) fn ensure_complete(snapshot: SystemSnapshot) -> Result<SystemSnapshot, ParseError> {
    if snapshot.driver_version.trim().is_empty() {
        return Err(ParseError::Incomplete("driver_version is empty".to_string()));
    }
    Ok(snapshot)
}
