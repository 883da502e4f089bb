//! Internal events for sheetsweep metrics emission.
//!
//! Each event struct represents a measurable occurrence in a sweep run.
//! Events implement the `InternalEvent` trait which emits the corresponding
//! Prometheus metric.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Final state of one sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcomeType {
    Completed,
    NoData,
    Skipped,
    Failed,
}

impl RunOutcomeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcomeType::Completed => "completed",
            RunOutcomeType::NoData => "no_data",
            RunOutcomeType::Skipped => "skipped",
            RunOutcomeType::Failed => "failed",
        }
    }
}

/// Step of the sweep at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStep {
    Fetch,
    Archive,
    Notify,
    Clear,
}

impl SweepStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepStep::Fetch => "fetch",
            SweepStep::Archive => "archive",
            SweepStep::Notify => "notify",
            SweepStep::Clear => "clear",
        }
    }
}

/// Event emitted when a sweep run finishes, whatever the outcome.
pub struct RunCompleted {
    pub outcome: RunOutcomeType,
}

impl InternalEvent for RunCompleted {
    fn emit(self) {
        trace!(outcome = self.outcome.as_str(), "Run completed");
        counter!("sheetsweep_runs_total", "outcome" => self.outcome.as_str()).increment(1);
    }
}

/// Event emitted with the wall time of a sweep run.
pub struct RunDuration {
    pub duration: Duration,
}

impl InternalEvent for RunDuration {
    fn emit(self) {
        trace!(duration_ms = self.duration.as_millis(), "Run duration");
        histogram!("sheetsweep_run_duration_seconds").record(self.duration.as_secs_f64());
    }
}

/// Event emitted when rows are read from the remote sheet.
pub struct RowsFetched {
    pub count: u64,
}

impl InternalEvent for RowsFetched {
    fn emit(self) {
        trace!(count = self.count, "Rows fetched");
        counter!("sheetsweep_rows_fetched_total").increment(self.count);
    }
}

/// Event emitted with the number of cells flagged by the scan.
pub struct ErrorCellsFound {
    pub count: u64,
}

impl InternalEvent for ErrorCellsFound {
    fn emit(self) {
        trace!(count = self.count, "Error cells found");
        counter!("sheetsweep_error_cells_total").increment(self.count);
    }
}

/// Event emitted when an archive file is written.
pub struct ArchiveWritten {
    pub bytes: u64,
}

impl InternalEvent for ArchiveWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, "Archive written");
        counter!("sheetsweep_archive_bytes_written_total").increment(self.bytes);
    }
}

/// Event emitted when a step of the sweep fails.
pub struct StepFailed {
    pub step: SweepStep,
}

impl InternalEvent for StepFailed {
    fn emit(self) {
        trace!(step = self.step.as_str(), "Step failed");
        counter!("sheetsweep_step_failures_total", "step" => self.step.as_str()).increment(1);
    }
}
