use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::hash::HashVerifier;
use crate::core::error::{CoreError, CoreResult};
use crate::core::http::ApiClient;
use crate::core::progress::{DownloadProgressStatus, StatusCallback};

/// Write buffer for streamed bodies (64 KiB).
const TRANSFER_BUFFER_SIZE: usize = 64 * 1024;

/// One restartable file transfer: stream to a staging file, verify, publish.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer(
        &self,
        url: &str,
        target: &Path,
        expected_digest: Option<&str>,
        on_progress: Option<&StatusCallback>,
        cancel: &CancellationToken,
    ) -> CoreResult<()>;
}

/// HTTP implementation of [`Transfer`].
pub struct TransferEngine {
    api: ApiClient,
}

impl TransferEngine {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Staging location for `target`: the same path with `.tmp` appended.
    pub fn staging_path(target: &Path) -> PathBuf {
        let mut name: OsString = target.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn stream_to_staging(
        &self,
        url: &str,
        staged: &Path,
        on_progress: Option<&StatusCallback>,
        cancel: &CancellationToken,
    ) -> CoreResult<u64> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            response = self.api.get(url).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let started = Instant::now();
        let mut downloaded: u64 = 0;

        // Scoped so the handle is closed before the rename below; Windows
        // refuses to move files that are still open.
        {
            let file = tokio::fs::File::create(staged)
                .await
                .map_err(|e| CoreError::io(staged, e))?;
            let mut writer = BufWriter::with_capacity(TRANSFER_BUFFER_SIZE, file);
            let mut stream = response.bytes_stream();

            while let Some(chunk) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CoreError::Cancelled),
                chunk = stream.next() => chunk,
            } {
                let chunk = chunk?;
                writer
                    .write_all(&chunk)
                    .await
                    .map_err(|e| CoreError::io(staged, e))?;
                downloaded += chunk.len() as u64;

                if let (Some(callback), Some(total)) = (on_progress, total_bytes) {
                    let elapsed = started.elapsed().as_secs_f64();
                    callback(DownloadProgressStatus {
                        downloaded_bytes: downloaded,
                        total_bytes: Some(total),
                        percent: if total == 0 {
                            100.0
                        } else {
                            (downloaded as f64 / total as f64 * 100.0).min(100.0)
                        },
                        bytes_per_second: (elapsed > 0.0).then(|| downloaded as f64 / elapsed),
                    });
                }
            }

            writer
                .flush()
                .await
                .map_err(|e| CoreError::io(staged, e))?;
            writer
                .into_inner()
                .sync_all()
                .await
                .map_err(|e| CoreError::io(staged, e))?;
        }

        if let Some(total) = total_bytes {
            if downloaded < total {
                return Err(CoreError::io(
                    staged,
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("body ended after {downloaded} of {total} bytes"),
                    ),
                ));
            }
        }

        Ok(downloaded)
    }
}

#[async_trait]
impl Transfer for TransferEngine {
    async fn transfer(
        &self,
        url: &str,
        target: &Path,
        expected_digest: Option<&str>,
        on_progress: Option<&StatusCallback>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(parent, e))?;
        }

        let staged = Self::staging_path(target);

        let downloaded = match self
            .stream_to_staging(url, &staged, on_progress, cancel)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                discard(&staged).await;
                return Err(e);
            }
        };

        if let Some(expected) = expected_digest {
            if let Err(e) = HashVerifier::verify(&staged, expected).await {
                let e = match e {
                    CoreError::DigestMismatch {
                        expected, actual, ..
                    } => CoreError::DigestMismatch {
                        path: target.to_path_buf(),
                        expected,
                        actual,
                    },
                    other => other,
                };
                warn!("Integrity check failed for {}: {}", url, e);
                discard(&staged).await;
                return Err(e);
            }
        }

        if let Err(e) = publish(&staged, target).await {
            discard(&staged).await;
            return Err(e);
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, target, downloaded);
        Ok(())
    }
}

/// Replace whatever sits at `target` with the staged file.
async fn publish(staged: &Path, target: &Path) -> CoreResult<()> {
    match tokio::fs::remove_file(target).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(CoreError::io(target, e)),
    }
    tokio::fs::rename(staged, target)
        .await
        .map_err(|e| CoreError::io(target, e))
}

async fn discard(staged: &Path) {
    match tokio::fs::remove_file(staged).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove staging file {:?}: {}", staged, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_path_appends_suffix() {
        assert_eq!(
            TransferEngine::staging_path(Path::new("/game/assets/indexes/17.json")),
            PathBuf::from("/game/assets/indexes/17.json.tmp")
        );
    }

    #[tokio::test]
    async fn publish_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("client.jar");
        let staged = TransferEngine::staging_path(&target);
        tokio::fs::write(&target, b"old").await.unwrap();
        tokio::fs::write(&staged, b"new").await.unwrap();

        publish(&staged, &target).await.unwrap();

        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"new");
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("file.bin");
        let engine = TransferEngine::new(ApiClient::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine
            .transfer("http://127.0.0.1:9/never", &target, None, None, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!dir.path().join("nested").exists());
    }
}
