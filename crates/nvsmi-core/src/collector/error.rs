//! Error taxonomy for a refresh cycle.

use thiserror::Error;

use super::smi::ParseError;
use super::traits::RunError;

/// Why a refresh cycle was aborted.
///
/// None of these are fatal to the process: the cycle ends, the success flag
/// stays cleared and previously published values stay in the table.
/// `Clone` so that scrapes queued behind an in-flight cycle can share its result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectError {
    /// The tool could not be started, exited non-zero, or timed out.
    #[error("command `{command}` failed: {reason}")]
    Command { command: String, reason: String },
    /// The output is not a well-formed document (tool/version mismatch).
    #[error("malformed output: {0}")]
    MalformedOutput(String),
    /// The output parsed but holds no usable reading.
    #[error("incomplete data: {0}")]
    IncompleteData(String),
}

impl CollectError {
    /// Wraps a runner failure together with the command line that caused it.
    pub fn command(command_line: impl Into<String>, err: RunError) -> Self {
        CollectError::Command {
            command: command_line.into(),
            reason: err.to_string(),
        }
    }

    /// Stable tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CollectError::Command { .. } => "command",
            CollectError::MalformedOutput(_) => "malformed_output",
            CollectError::IncompleteData(_) => "incomplete_data",
        }
    }
}

impl From<ParseError> for CollectError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Malformed(msg) => CollectError::MalformedOutput(msg),
            ParseError::Incomplete(msg) => CollectError::IncompleteData(msg),
        }
    }
}
