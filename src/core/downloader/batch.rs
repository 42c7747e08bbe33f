use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use super::task::{DownloadResult, DownloadTask};
use super::transfer::Transfer;
use crate::core::config::DEFAULT_MAX_CONCURRENCY;
use crate::core::error::{CoreError, CoreResult};
use crate::core::progress::{ProgressReporter, StatusCallback};

/// Runs transfers with retry and a bounded-concurrency gate.
///
/// Individual failures never fail a batch: every task yields exactly one
/// [`DownloadResult`]. Only cancellation is returned as an error.
pub struct BatchDownloadCoordinator {
    transfer: Arc<dyn Transfer>,
    retry: RetryPolicy,
    default_concurrency: usize,
}

impl BatchDownloadCoordinator {
    pub fn new(transfer: Arc<dyn Transfer>, retry: RetryPolicy) -> Self {
        Self {
            transfer,
            retry,
            default_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Concurrency used when a caller passes `0`.
    pub fn with_default_concurrency(mut self, n: usize) -> Self {
        self.default_concurrency = n.max(1);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    // ── Single task ─────────────────────────────────────

    /// Download one task, retrying transient failures with exponential
    /// backoff. Integrity failures return immediately as a failed result.
    pub async fn download_one(
        &self,
        task: &DownloadTask,
        on_progress: Option<&StatusCallback>,
        cancel: &CancellationToken,
    ) -> CoreResult<DownloadResult> {
        let mut retries = 0u32;

        loop {
            let attempt = self
                .transfer
                .transfer(
                    &task.url,
                    &task.target_path,
                    task.expected_digest.as_deref(),
                    on_progress,
                    cancel,
                )
                .await;

            let attempt = match attempt {
                Ok(()) => check_size(task).await,
                Err(e) => Err(e),
            };

            let error = match attempt {
                Ok(()) => return Ok(DownloadResult::succeeded(task, retries)),
                Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
                Err(e) => e,
            };

            if !error.is_retryable() {
                warn!("{} failed, not retrying: {}", task.description, error);
                return Ok(DownloadResult::failed(task, error, retries));
            }

            if retries >= self.retry.max_retries() {
                warn!(
                    "{} failed after {} attempts: {}",
                    task.description,
                    retries + 1,
                    error
                );
                return Ok(DownloadResult::failed(task, error, retries));
            }

            retries += 1;
            let delay = self.retry.delay_for(retries);
            debug!(
                "Retrying {} in {:?} (retry {}/{}): {}",
                task.url,
                delay,
                retries,
                self.retry.max_retries(),
                error
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CoreError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    // ── Batch ───────────────────────────────────────────

    /// Download many tasks, lowest priority value first, with at most
    /// `max_concurrency` transfers in flight (`0` selects the default).
    ///
    /// Progress is `completed / total * 100`, reported once per completed
    /// task; per-byte progress is not forwarded in batch mode.
    pub async fn download_many(
        &self,
        mut tasks: Vec<DownloadTask>,
        max_concurrency: usize,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<DownloadResult>> {
        if tasks.is_empty() {
            progress.report(100.0);
            return Ok(Vec::new());
        }

        let concurrency = if max_concurrency == 0 {
            self.default_concurrency
        } else {
            max_concurrency
        };
        tasks.sort_by_key(|task| task.priority);
        let total = tasks.len();

        info!(
            "Starting batch download: {} files, concurrency={}",
            total, concurrency
        );

        let gate = Semaphore::new(concurrency);
        let completed = Mutex::new(0usize);

        let mut pending: FuturesUnordered<_> = tasks
            .iter()
            .map(|task| {
                let gate = &gate;
                let completed = &completed;
                async move {
                    let permit = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(CoreError::Cancelled),
                        permit = gate.acquire() => permit,
                    };
                    // The gate is owned by this call and never closed.
                    let Ok(permit) = permit else {
                        return Err(CoreError::Cancelled);
                    };

                    let result = match self.download_one(task, None, cancel).await {
                        Ok(result) => result,
                        Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
                        Err(e) => DownloadResult::failed(task, e, 0),
                    };
                    drop(permit);

                    let mut done = completed.lock().await;
                    *done += 1;
                    progress.report(*done as f64 / total as f64 * 100.0);

                    Ok::<DownloadResult, CoreError>(result)
                }
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        // Drain everything, even after a cancellation, so in-flight
        // transfers get to remove their staging files.
        while let Some(outcome) = pending.next().await {
            match outcome {
                Ok(result) => results.push(result),
                Err(_) => cancelled = true,
            }
        }

        if cancelled {
            info!(
                "Batch download cancelled after {} of {} files",
                results.len(),
                total
            );
            return Err(CoreError::Cancelled);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            warn!("Batch download finished: {} ok, {} failed", total - failed, failed);
        } else {
            info!("Batch download finished: {} files", total);
        }

        Ok(results)
    }
}

/// Compare the published file against `expected_size`, removing it on a
/// mismatch.
async fn check_size(task: &DownloadTask) -> CoreResult<()> {
    let Some(expected) = task.expected_size else {
        return Ok(());
    };
    let path = &task.target_path;
    let actual = tokio::fs::metadata(path)
        .await
        .map_err(|e| CoreError::io(path, e))?
        .len();
    if actual == expected {
        return Ok(());
    }

    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove mis-sized file {:?}: {}", path, e);
    }
    Err(CoreError::SizeMismatch {
        path: path.clone(),
        expected,
        actual,
    })
}
