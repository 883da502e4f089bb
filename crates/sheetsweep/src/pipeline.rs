//! One sweep: fetch, archive, notify, clear.
//!
//! ## Step ordering
//!
//! 1. Fetch the whole range. Nothing fetched means nothing else happens.
//! 2. Write the dated archive. If this fails the sheet is left untouched.
//! 3. Email the summary with the archive attached.
//! 4. Clear the range. Attempted whenever the archive exists, so a failed
//!    email never keeps data in the sheet past its archive.
//!
//! Only one sweep runs at a time; an overlapping trigger is skipped.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;
use snafu::prelude::*;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use sheetsweep_core::emit;
use sheetsweep_core::metrics::events::{
    ArchiveWritten, ErrorCellsFound, RowsFetched, RunCompleted, RunDuration, RunOutcomeType,
    StepFailed, SweepStep,
};
use sheetsweep_core::schedule::ScheduledJob;

use crate::archive::{ArchiveFile, ArchiveWriter};
use crate::config::Config;
use crate::error::{
    ArchiveSnafu, ArchiveTaskSnafu, FetchSnafu, InitError, NotifierInitSnafu, RunError,
    SourceInitSnafu,
};
use crate::grid::RunSummary;
use crate::notify::{Notifier, SmtpNotifier};
use crate::source::{GoogleSheetsClient, SheetSource};

/// Result of a run that did not fail outright.
#[derive(Debug)]
pub enum RunOutcome {
    /// The range was empty; nothing was archived, sent or cleared.
    NoData,
    /// Another run was still in progress.
    Skipped,
    /// Data was archived; see the report for the later steps.
    Completed(RunReport),
}

impl RunOutcome {
    fn metric_type(&self) -> RunOutcomeType {
        match self {
            RunOutcome::NoData => RunOutcomeType::NoData,
            RunOutcome::Skipped => RunOutcomeType::Skipped,
            RunOutcome::Completed(_) => RunOutcomeType::Completed,
        }
    }
}

/// What happened in a run that produced an archive.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub archive: ArchiveFile,
    pub notified: bool,
    pub cleared: bool,
}

/// The daily sweep job.
pub struct SweepPipeline {
    source: Arc<dyn SheetSource>,
    notifier: Arc<dyn Notifier>,
    archive: ArchiveWriter,
    guard: Mutex<()>,
}

impl SweepPipeline {
    pub fn new(
        source: Arc<dyn SheetSource>,
        notifier: Arc<dyn Notifier>,
        archive: ArchiveWriter,
    ) -> Self {
        Self {
            source,
            notifier,
            archive,
            guard: Mutex::new(()),
        }
    }

    /// Wire up the Sheets client and SMTP notifier from configuration.
    pub fn from_config(config: &Config) -> Result<Self, InitError> {
        let source = GoogleSheetsClient::from_config(&config.source).context(SourceInitSnafu)?;
        let notifier = SmtpNotifier::from_config(&config.notify).context(NotifierInitSnafu)?;

        Ok(Self::new(
            Arc::new(source),
            Arc::new(notifier),
            ArchiveWriter::from_config(&config.archive),
        ))
    }

    /// Run one sweep.
    ///
    /// Errors are returned only for the fetch and archive steps, which leave
    /// the sheet untouched. Notification and clear failures are logged and
    /// reported in the [`RunReport`].
    pub async fn run_once(&self) -> Result<RunOutcome, RunError> {
        let Ok(_running) = self.guard.try_lock() else {
            warn!("Previous sweep still running, skipping this trigger");
            emit!(RunCompleted {
                outcome: RunOutcomeType::Skipped,
            });
            return Ok(RunOutcome::Skipped);
        };

        let start = Instant::now();
        let result = self.sweep().await;

        let outcome = match &result {
            Ok(outcome) => outcome.metric_type(),
            Err(_) => RunOutcomeType::Failed,
        };
        emit!(RunCompleted { outcome });
        emit!(RunDuration {
            duration: start.elapsed(),
        });

        result
    }

    async fn sweep(&self) -> Result<RunOutcome, RunError> {
        let grid = self
            .source
            .read()
            .await
            .inspect_err(|e| {
                error!(error = %e, "Failed to fetch Google Sheet");
                emit!(StepFailed {
                    step: SweepStep::Fetch,
                });
            })
            .context(FetchSnafu)?;

        emit!(RowsFetched {
            count: grid.row_count() as u64,
        });

        if grid.is_empty() {
            info!("No data found in Google Sheet");
            return Ok(RunOutcome::NoData);
        }
        info!(rows = grid.row_count(), "Google Sheet fetched");

        let writer = self.archive.clone();
        // Local date: a 23:59:59 local run belongs to today, whatever the UTC date.
        let date = Local::now().date_naive();
        // The grid comes back with the result so the scan can run on it.
        let (grid, written) = tokio::task::spawn_blocking(move || {
            let written = writer.write(&grid, date);
            (grid, written)
        })
        .await
        .context(ArchiveTaskSnafu)?;

        let archive = written
            .inspect_err(|e| {
                error!(error = %e, "Failed to write archive, leaving sheet untouched");
                emit!(StepFailed {
                    step: SweepStep::Archive,
                });
            })
            .context(ArchiveSnafu)?;
        emit!(ArchiveWritten {
            bytes: archive.bytes,
        });

        let summary = RunSummary::from_grid(&grid);
        emit!(ErrorCellsFound {
            count: summary.error_count() as u64,
        });
        info!(
            size = %summary.sheet_size(),
            error_count = summary.error_count(),
            "Sheet scanned"
        );

        let notified = match self.notifier.send(&summary, &archive).await {
            Ok(delivery) => {
                info!(code = %delivery.code, response = %delivery.message, "Report delivered");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to send report email");
                emit!(StepFailed {
                    step: SweepStep::Notify,
                });
                false
            }
        };

        let cleared = match self.source.clear().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to clear Google Sheet");
                emit!(StepFailed {
                    step: SweepStep::Clear,
                });
                false
            }
        };

        Ok(RunOutcome::Completed(RunReport {
            summary,
            archive,
            notified,
            cleared,
        }))
    }
}

#[async_trait]
impl ScheduledJob for SweepPipeline {
    type Error = RunError;

    async fn run(&self) -> Result<(), Self::Error> {
        match self.run_once().await? {
            RunOutcome::Completed(report) if !report.notified || !report.cleared => {
                warn!(
                    notified = report.notified,
                    cleared = report.cleared,
                    "Sweep finished with failures"
                );
            }
            RunOutcome::Completed(report) => {
                info!(archive = %report.archive.path.display(), "Sweep finished");
            }
            RunOutcome::NoData | RunOutcome::Skipped => {}
        }
        Ok(())
    }
}
