// ─── Progress Reporting ───
// Uniform 0–100 progress sink accepted by every long-running operation.
// Nested operations receive a `scoped` reporter that linearly remaps their
// own 0–100 into a slice of the parent's range.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Byte-level status of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DownloadProgressStatus {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    /// 0–100, only meaningful when `total_bytes` is known.
    pub percent: f64,
    pub bytes_per_second: Option<f64>,
}

/// Callback receiving per-chunk transfer status.
pub type StatusCallback = Arc<dyn Fn(DownloadProgressStatus) + Send + Sync>;

#[derive(Clone)]
pub struct ProgressReporter {
    sink: Option<Arc<dyn Fn(f64) + Send + Sync>>,
    start: f64,
    end: f64,
}

impl ProgressReporter {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(sink)),
            start: 0.0,
            end: 100.0,
        }
    }

    /// A reporter that discards everything.
    pub fn silent() -> Self {
        Self {
            sink: None,
            start: 0.0,
            end: 100.0,
        }
    }

    /// Report local progress in 0–100; values outside are clamped.
    pub fn report(&self, percent: f64) {
        let Some(sink) = &self.sink else {
            return;
        };
        let local = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        sink(self.start + (self.end - self.start) * local / 100.0);
    }

    /// Reporter for a sub-operation owning `[start, end)` of this reporter's
    /// local range.
    pub fn scoped(&self, start: f64, end: f64) -> Self {
        let span = self.end - self.start;
        Self {
            sink: self.sink.clone(),
            start: self.start + span * start.clamp(0.0, 100.0) / 100.0,
            end: self.start + span * end.clamp(0.0, 100.0) / 100.0,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::silent()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("silent", &self.sink.is_none())
            .finish()
    }
}
