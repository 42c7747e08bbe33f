use std::path::PathBuf;

use crate::core::error::{CoreError, CoreResult};

/// A single file to fetch. Immutable once queued.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    pub target_path: PathBuf,
    /// Hex digest; algorithm is inferred from its length.
    pub expected_digest: Option<String>,
    pub expected_size: Option<u64>,
    /// Lower runs first.
    pub priority: i32,
    pub description: String,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, target_path: impl Into<PathBuf>) -> Self {
        let url = url.into();
        Self {
            description: url.clone(),
            url,
            target_path: target_path.into(),
            expected_digest: None,
            expected_size: None,
            priority: 0,
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.expected_digest = Some(digest.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Terminal record of the attempt sequence for one task.
#[derive(Debug)]
pub struct DownloadResult {
    pub url: String,
    pub target_path: PathBuf,
    pub success: bool,
    pub error_message: Option<String>,
    pub error: Option<CoreError>,
    /// Number of retries performed after the first attempt.
    pub retry_count: u32,
}

impl DownloadResult {
    pub(crate) fn succeeded(task: &DownloadTask, retry_count: u32) -> Self {
        Self {
            url: task.url.clone(),
            target_path: task.target_path.clone(),
            success: true,
            error_message: None,
            error: None,
            retry_count,
        }
    }

    pub(crate) fn failed(task: &DownloadTask, error: CoreError, retry_count: u32) -> Self {
        Self {
            url: task.url.clone(),
            target_path: task.target_path.clone(),
            success: false,
            error_message: Some(error.to_string()),
            error: Some(error),
            retry_count,
        }
    }

    /// Turn a failed result back into the error that ended it, for callers
    /// that cannot continue without this file.
    pub fn into_outcome(self) -> CoreResult<()> {
        if self.success {
            return Ok(());
        }
        Err(self.error.unwrap_or_else(|| {
            CoreError::Loader(
                self.error_message
                    .unwrap_or_else(|| format!("download of {} failed", self.url)),
            )
        }))
    }
}
