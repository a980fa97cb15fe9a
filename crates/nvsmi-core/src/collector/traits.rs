//! Command runner abstraction.
//!
//! The collector never spawns processes directly; it goes through
//! [`CommandRunner`], so tests can swap in `MockRunner`.

use std::future::Future;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Failure to obtain stdout from the external tool.
#[derive(Debug, Error)]
pub enum RunError {
    /// The process could not be started or its output could not be read.
    #[error("failed to execute: {0}")]
    Spawn(#[from] io::Error),
    /// The process ran but exited unsuccessfully.
    #[error("exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    /// The process did not finish in time and was killed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Runs an external program and returns its stdout.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, waiting at most `timeout`.
    ///
    /// Non-zero exit is an error; stderr is only used for the error message.
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, RunError>> + Send;
}

/// Runner backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<Vec<u8>, RunError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(RunError::Timeout(timeout)),
        };

        if !output.status.success() {
            return Err(RunError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}
