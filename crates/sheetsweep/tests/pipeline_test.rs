//! Step ordering and failure handling of a sweep, against in-memory
//! source and notifier doubles.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tempfile::TempDir;

use sheetsweep::archive::{ArchiveFile, ArchiveWriter, archive_file_name, read_archive};
use sheetsweep::error::{NotifyError, RunError, SourceError};
use sheetsweep::notify::{Delivery, Notifier};
use sheetsweep::source::SheetSource;
use sheetsweep::{Grid, RunOutcome, RunSummary, SweepPipeline};

/// Order in which the doubles were called, shared between them.
type EventLog = Arc<Mutex<Vec<&'static str>>>;

#[derive(Default)]
struct MemorySource {
    events: EventLog,
    grid: Mutex<Grid>,
    reads: AtomicUsize,
    clears: AtomicUsize,
    fail_read: bool,
    fail_clear: bool,
    read_delay: Option<Duration>,
}

impl MemorySource {
    fn with_rows(rows: &[&[&str]]) -> Self {
        Self {
            grid: Mutex::new(rows.iter().map(|row| row.to_vec()).collect()),
            ..Default::default()
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    fn is_empty(&self) -> bool {
        self.grid.lock().unwrap().is_empty()
    }

    fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetSource for MemorySource {
    async fn read(&self) -> Result<Grid, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("read");
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_read {
            return Err(SourceError::Status {
                operation: "read",
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(self.grid.lock().unwrap().clone())
    }

    async fn clear(&self) -> Result<(), SourceError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("clear");
        if self.fail_clear {
            return Err(SourceError::Status {
                operation: "clear",
                status: 403,
                body: "permission denied".to_string(),
            });
        }
        *self.grid.lock().unwrap() = Grid::default();
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: EventLog,
    sent: Mutex<Vec<(RunSummary, ArchiveFile)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    fn sharing(source: &MemorySource) -> Self {
        Self {
            events: source.events.clone(),
            ..Default::default()
        }
    }

    fn failing(source: &MemorySource) -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Self::sharing(source)
        }
    }

    fn sent(&self) -> Vec<(RunSummary, ArchiveFile)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        summary: &RunSummary,
        archive: &ArchiveFile,
    ) -> Result<Delivery, NotifyError> {
        self.events.lock().unwrap().push("send");
        assert!(
            archive.path.exists(),
            "archive must be on disk before the report is sent"
        );
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::ReadAttachment {
                path: archive.path.clone(),
                source: std::io::Error::other("mail relay refused connection"),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((summary.clone(), archive.clone()));
        Ok(Delivery {
            code: "250".to_string(),
            message: "OK queued".to_string(),
        })
    }
}

fn reference_source() -> MemorySource {
    MemorySource::with_rows(&[&["A", "B"], &["Error", "C"], &["D", "Error"]])
}

fn pipeline(
    source: &Arc<MemorySource>,
    notifier: &Arc<RecordingNotifier>,
    directory: PathBuf,
) -> SweepPipeline {
    SweepPipeline::new(
        source.clone(),
        notifier.clone(),
        ArchiveWriter::new(directory, "RC", "Sheet1"),
    )
}

fn expect_report(outcome: RunOutcome) -> sheetsweep::RunReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        other => panic!("expected a completed run, got {other:?}"),
    }
}

#[tokio::test]
async fn test_full_sweep() {
    let temp_dir = TempDir::new().unwrap();
    let directory = temp_dir.path().join("DATA RC");
    let source = Arc::new(reference_source());
    let notifier = Arc::new(RecordingNotifier::sharing(&source));
    let pipeline = pipeline(&source, &notifier, directory.clone());

    let report = expect_report(pipeline.run_once().await.unwrap());

    let expected_path = directory.join(archive_file_name("RC", Local::now().date_naive()));
    assert_eq!(report.archive.path, expected_path);
    assert!(report.notified);
    assert!(report.cleared);
    assert_eq!(report.summary.sheet_size(), "3 rows x 2 columns");
    assert_eq!(
        report.summary.error_details(),
        "Row 2, Column 1; Row 3, Column 2"
    );

    let archived = read_archive(&expected_path, "Sheet1").unwrap();
    let expected: Grid = vec![vec!["A", "B"], vec!["Error", "C"], vec!["D", "Error"]]
        .into_iter()
        .collect();
    assert_eq!(archived, expected);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0.error_count(), 2);
    assert_eq!(sent[0].1.path, expected_path);

    assert_eq!(source.clears(), 1);
    assert!(source.is_empty());
    assert_eq!(source.events(), ["read", "send", "clear"]);
}

#[tokio::test]
async fn test_empty_sheet_does_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let directory = temp_dir.path().join("DATA RC");
    let source = Arc::new(MemorySource::default());
    let notifier = Arc::new(RecordingNotifier::sharing(&source));
    let pipeline = pipeline(&source, &notifier, directory.clone());

    let outcome = pipeline.run_once().await.unwrap();

    assert!(matches!(outcome, RunOutcome::NoData));
    assert!(!directory.exists());
    assert!(notifier.sent().is_empty());
    assert_eq!(source.clears(), 0);
    assert_eq!(source.events(), ["read"]);
}

#[tokio::test]
async fn test_fetch_failure_stops_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let directory = temp_dir.path().join("DATA RC");
    let source = Arc::new(MemorySource {
        fail_read: true,
        ..reference_source()
    });
    let notifier = Arc::new(RecordingNotifier::sharing(&source));
    let pipeline = pipeline(&source, &notifier, directory.clone());

    let err = pipeline.run_once().await.unwrap_err();

    assert!(matches!(err, RunError::Fetch { .. }));
    assert!(err.to_string().contains("503"));
    assert!(!directory.exists());
    assert!(notifier.sent().is_empty());
    assert_eq!(source.clears(), 0);
}

#[tokio::test]
async fn test_archive_failure_keeps_sheet() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let source = Arc::new(reference_source());
    let notifier = Arc::new(RecordingNotifier::sharing(&source));
    let pipeline = pipeline(&source, &notifier, blocker.join("DATA RC"));

    let err = pipeline.run_once().await.unwrap_err();

    assert!(matches!(err, RunError::Archive { .. }));
    assert!(notifier.sent().is_empty());
    assert_eq!(source.clears(), 0);
    assert!(!source.is_empty());
    assert_eq!(source.events(), ["read"]);
}

#[tokio::test]
async fn test_email_failure_still_clears() {
    let temp_dir = TempDir::new().unwrap();
    let source = Arc::new(reference_source());
    let notifier = Arc::new(RecordingNotifier::failing(&source));
    let pipeline = pipeline(&source, &notifier, temp_dir.path().to_path_buf());

    let report = expect_report(pipeline.run_once().await.unwrap());

    assert!(!report.notified);
    assert!(report.cleared);
    assert!(report.archive.path.exists());
    assert_eq!(source.clears(), 1);
    assert!(source.is_empty());
    assert_eq!(source.events(), ["read", "send", "clear"]);
}

#[tokio::test]
async fn test_clear_failure_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let source = Arc::new(MemorySource {
        fail_clear: true,
        ..reference_source()
    });
    let notifier = Arc::new(RecordingNotifier::sharing(&source));
    let pipeline = pipeline(&source, &notifier, temp_dir.path().to_path_buf());

    let report = expect_report(pipeline.run_once().await.unwrap());

    assert!(report.notified);
    assert!(!report.cleared);
    assert_eq!(source.clears(), 1);
    assert!(!source.is_empty());
}

#[tokio::test]
async fn test_overlapping_run_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let source = Arc::new(MemorySource {
        read_delay: Some(Duration::from_millis(200)),
        ..reference_source()
    });
    let notifier = Arc::new(RecordingNotifier::sharing(&source));
    let pipeline = pipeline(&source, &notifier, temp_dir.path().to_path_buf());

    let (first, second) = tokio::join!(pipeline.run_once(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        pipeline.run_once().await
    });

    assert!(matches!(first.unwrap(), RunOutcome::Completed(_)));
    assert!(matches!(second.unwrap(), RunOutcome::Skipped));
    assert_eq!(source.reads(), 1);
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(source.clears(), 1);
}

#[tokio::test]
async fn test_next_day_run_after_clear_finds_no_data() {
    let temp_dir = TempDir::new().unwrap();
    let source = Arc::new(reference_source());
    let notifier = Arc::new(RecordingNotifier::sharing(&source));
    let pipeline = pipeline(&source, &notifier, temp_dir.path().to_path_buf());

    expect_report(pipeline.run_once().await.unwrap());
    let outcome = pipeline.run_once().await.unwrap();

    assert!(matches!(outcome, RunOutcome::NoData));
    assert_eq!(notifier.sent().len(), 1);
}
