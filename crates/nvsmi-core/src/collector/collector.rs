//! Refresh cycle orchestration.
//!
//! A cycle is: clear the success flag, run the tool, parse its output, and
//! publish every mapped value together with the success flag in one table
//! batch. At most one cycle runs at a time; scrapes that arrive while a cycle
//! is in flight wait for it and share its outcome instead of spawning the
//! tool again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::collector::error::CollectError;
use crate::collector::smi::{self, SmiCommand};
use crate::collector::traits::CommandRunner;
use crate::metrics::{Family, MetricTable, mapper};

/// Summary of a successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub driver_version: String,
    pub devices: usize,
    /// Readings that did not yield a number (absent or non-numeric).
    pub skipped: usize,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

pub type CycleOutcome = Result<CycleReport, CollectError>;

/// Drives refresh cycles against a shared [`MetricTable`].
///
/// Generic over the runner so tests can use `MockRunner`.
pub struct Collector<R: CommandRunner> {
    runner: R,
    command: SmiCommand,
    table: Arc<MetricTable>,
    /// Held for the whole cycle; doubles as the in-flight guard.
    last: Mutex<Option<CycleOutcome>>,
    /// Number of finished cycles, readable without the lock.
    completed: AtomicU64,
    healthy: AtomicBool,
}

impl<R: CommandRunner> Collector<R> {
    pub fn new(runner: R, command: SmiCommand, table: Arc<MetricTable>) -> Self {
        Self {
            runner,
            command,
            table,
            last: Mutex::new(None),
            completed: AtomicU64::new(0),
            healthy: AtomicBool::new(false),
        }
    }

    pub fn command(&self) -> &SmiCommand {
        &self.command
    }

    pub fn table(&self) -> &Arc<MetricTable> {
        &self.table
    }

    /// Runs a cycle with the command's configured timeout.
    pub async fn collect(&self) -> CycleOutcome {
        self.collect_with_timeout(self.command.timeout).await
    }

    /// Runs a cycle, or joins the one already in flight.
    ///
    /// `timeout` bounds the tool's execution; it is ignored when the call
    /// ends up sharing another caller's cycle.
    pub async fn collect_with_timeout(&self, timeout: Duration) -> CycleOutcome {
        let seen = self.completed.load(Ordering::Acquire);
        let mut last = self.last.lock().await;

        if self.completed.load(Ordering::Acquire) != seen
            && let Some(outcome) = last.as_ref()
        {
            debug!("sharing result of the cycle that finished while waiting");
            return outcome.clone();
        }

        let outcome = self.run_cycle(timeout).await;
        self.log_outcome(&outcome);

        *last = Some(outcome.clone());
        self.completed.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Outcome of the most recent finished cycle.
    pub async fn last_outcome(&self) -> Option<CycleOutcome> {
        self.last.lock().await.clone()
    }

    /// Number of cycles that actually ran the tool.
    pub fn cycles(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Checks that the tool can be executed at all (`<program> -h`).
    pub async fn probe(&self) -> Result<(), CollectError> {
        let args = ["-h".to_string()];
        self.runner
            .run(&self.command.program, &args, self.command.timeout)
            .await
            .map(|_| ())
            .map_err(|e| CollectError::command(format!("{} -h", self.command.program), e))
    }

    async fn run_cycle(&self, timeout: Duration) -> CycleOutcome {
        let started = Instant::now();
        self.table.set_collector_success(false);

        let raw = self
            .runner
            .run(&self.command.program, &self.command.args, timeout)
            .await
            .map_err(|e| CollectError::command(self.command.command_line(), e))?;

        let snapshot = smi::parse(self.command.format, &raw)?;

        let (stats, duration) = {
            let mut writer = self.table.writer();
            let stats = mapper::write_snapshot(&snapshot, &mut writer);
            let duration = started.elapsed();
            writer.set(Family::CollectorDuration, &[], duration.as_secs_f64());
            writer.set_collector_success(true);
            (stats, duration)
        };

        Ok(CycleReport {
            driver_version: snapshot.driver_version,
            devices: stats.devices,
            skipped: stats.skipped,
            duration,
            finished_at: Utc::now(),
        })
    }

    fn log_outcome(&self, outcome: &CycleOutcome) {
        match outcome {
            Ok(report) => {
                let recovered = !self.healthy.swap(true, Ordering::AcqRel);
                if recovered {
                    info!(
                        driver = %report.driver_version,
                        devices = report.devices,
                        duration_ms = report.duration.as_millis() as u64,
                        finished_at = %report.finished_at.to_rfc3339(),
                        "collection succeeded"
                    );
                } else {
                    debug!(
                        devices = report.devices,
                        skipped = report.skipped,
                        duration_ms = report.duration.as_millis() as u64,
                        finished_at = %report.finished_at.to_rfc3339(),
                        "collection finished"
                    );
                }
            }
            Err(e) => {
                self.healthy.store(false, Ordering::Release);
                match e {
                    CollectError::IncompleteData(_) => {
                        warn!(kind = e.kind(), error = %e, "collection produced no data")
                    }
                    _ => error!(
                        command = %self.command.command_line(),
                        kind = e.kind(),
                        error = %e,
                        "collection failed"
                    ),
                }
            }
        }
    }
}
