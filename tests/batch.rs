use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mcfetch::core::downloader::{BatchDownloadCoordinator, DownloadTask, RetryPolicy, Transfer};
use mcfetch::core::progress::StatusCallback;
use mcfetch::{CoreError, CoreResult, ProgressReporter};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy)]
enum Behaviour {
    Succeed,
    Transport,
    Corrupt,
    /// Fails with a 502 for the first `n` attempts, then succeeds.
    FailFirst(u32),
}

/// Scripted transfer that records attempts, call order and peak parallelism.
struct FakeTransfer {
    behaviour: Behaviour,
    delay: Duration,
    attempts: AtomicU32,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeTransfer {
    fn new(behaviour: Behaviour, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            delay,
            attempts: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transfer for FakeTransfer {
    async fn transfer(
        &self,
        url: &str,
        target: &Path,
        _expected_digest: Option<&str>,
        _on_progress: Option<&StatusCallback>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::FailFirst(n) if attempt >= n => Ok(()),
            Behaviour::Transport | Behaviour::FailFirst(_) => Err(CoreError::DownloadFailed {
                url: url.to_string(),
                status: 502,
            }),
            Behaviour::Corrupt => Err(CoreError::DigestMismatch {
                path: target.to_path_buf(),
                expected: "aa".into(),
                actual: "bb".into(),
            }),
        }
    }
}

fn coordinator(transfer: Arc<FakeTransfer>) -> BatchDownloadCoordinator {
    BatchDownloadCoordinator::new(transfer, RetryPolicy::new(3, Duration::from_millis(1)))
}

fn tasks(n: usize) -> Vec<DownloadTask> {
    (0..n)
        .map(|i| DownloadTask::new(format!("https://example.invalid/{i}"), PathBuf::from(format!("/tmp/{i}"))))
        .collect()
}

#[tokio::test]
async fn retry_ceiling_bounds_attempts() {
    let transfer = FakeTransfer::new(Behaviour::Transport, Duration::ZERO);
    let result = coordinator(transfer.clone())
        .download_one(&tasks(1)[0], None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.retry_count, 3);
    assert_eq!(transfer.attempts.load(Ordering::SeqCst), 4);
    assert!(matches!(result.error, Some(CoreError::DownloadFailed { status: 502, .. })));
}

#[tokio::test]
async fn transient_failures_then_success_records_retries() {
    let transfer = FakeTransfer::new(Behaviour::FailFirst(2), Duration::ZERO);
    let result = coordinator(transfer.clone())
        .download_one(&tasks(1)[0], None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.retry_count, 2);
    assert!(result.error.is_none());
    assert_eq!(transfer.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn digest_mismatch_is_not_retried() {
    let transfer = FakeTransfer::new(Behaviour::Corrupt, Duration::ZERO);
    let result = coordinator(transfer.clone())
        .download_one(&tasks(1)[0], None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.retry_count, 0);
    assert_eq!(transfer.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_propagates_instead_of_failing() {
    let transfer = FakeTransfer::new(Behaviour::Succeed, Duration::ZERO);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = coordinator(transfer.clone())
        .download_many(tasks(5), 2, &ProgressReporter::silent(), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(transfer.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrency_never_exceeds_gate() {
    let transfer = FakeTransfer::new(Behaviour::Succeed, Duration::from_millis(20));
    let results = coordinator(transfer.clone())
        .download_many(tasks(20), 3, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 20);
    assert!(results.iter().all(|r| r.success));
    let peak = transfer.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency was {peak}");
    assert!(peak >= 2, "gate never let transfers overlap");
}

#[tokio::test]
async fn tasks_run_in_ascending_priority_order() {
    let transfer = FakeTransfer::new(Behaviour::Succeed, Duration::ZERO);
    let batch = tasks(4)
        .into_iter()
        .zip([3, 1, 2, 0])
        .map(|(task, priority)| task.with_priority(priority))
        .collect();

    coordinator(transfer.clone())
        .download_many(batch, 1, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        *transfer.calls.lock().unwrap(),
        vec![
            "https://example.invalid/3",
            "https://example.invalid/1",
            "https://example.invalid/2",
            "https://example.invalid/0",
        ]
    );
}

#[tokio::test]
async fn failures_are_accumulated_not_thrown() {
    let transfer = FakeTransfer::new(Behaviour::Transport, Duration::ZERO);
    let results = coordinator(transfer)
        .download_many(tasks(4), 0, &ProgressReporter::silent(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| !r.success && r.retry_count == 3));
}

#[tokio::test]
async fn aggregate_progress_is_monotonic_and_ends_at_100() {
    let transfer = FakeTransfer::new(Behaviour::Succeed, Duration::from_millis(5));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress = ProgressReporter::new(move |p| sink.lock().unwrap().push(p));

    coordinator(transfer)
        .download_many(tasks(10), 4, &progress, &CancellationToken::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 10);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(*seen.last().unwrap(), 100.0);
}

#[tokio::test]
async fn empty_batch_reports_complete() {
    let transfer = FakeTransfer::new(Behaviour::Succeed, Duration::ZERO);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress = ProgressReporter::new(move |p| sink.lock().unwrap().push(p));

    let results = coordinator(transfer)
        .download_many(Vec::new(), 4, &progress, &CancellationToken::new())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![100.0]);
}
