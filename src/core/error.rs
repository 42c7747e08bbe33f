use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the acquisition and installation engine.
/// Every module returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("Digest mismatch for {path:?}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Size mismatch for {path:?}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Unsupported digest format: {0}")]
    UnsupportedDigest(String),

    // ── Control flow ────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,

    // ── Version metadata ────────────────────────────────
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Invalid version descriptor {id}: {reason}")]
    InvalidDescriptor { id: String, reason: String },

    // ── Formats ─────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Orchestration ───────────────────────────────────
    #[error("Loader {loader} is not supported as {mode}")]
    UnsupportedLoader { loader: String, mode: &'static str },

    #[error("No loader selections were supplied")]
    NoSelections,

    #[error("Combo install aborted at {loader} (completed: {completed:?}): {source}")]
    ComboAborted {
        loader: String,
        completed: Vec<String>,
        #[source]
        source: Box<CoreError>,
    },

    // ── Loader ──────────────────────────────────────────
    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Loader API unreachable: {0}")]
    LoaderApi(String),

    // ── Configuration ───────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }

    /// Integrity failures are never retried: the payload itself is wrong.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            CoreError::DigestMismatch { .. }
                | CoreError::SizeMismatch { .. }
                | CoreError::UnsupportedDigest(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_cancelled() && !self.is_integrity_failure()
    }
}

impl From<std::io::Error> for CoreError {
    fn from(source: std::io::Error) -> Self {
        CoreError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_mismatch_is_not_retryable() {
        let err = CoreError::DigestMismatch {
            path: PathBuf::from("a.jar"),
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert!(err.is_integrity_failure());
        assert!(!err.is_retryable());
    }

    #[test]
    fn size_mismatch_is_an_integrity_failure() {
        let err = CoreError::SizeMismatch {
            path: PathBuf::from("a.jar"),
            expected: 10,
            actual: 9,
        };
        assert!(err.is_integrity_failure());
        assert!(!err.is_retryable());
    }

    #[test]
    fn cancellation_is_distinct_from_failure() {
        assert!(CoreError::Cancelled.is_cancelled());
        assert!(!CoreError::Cancelled.is_retryable());
        assert!(!CoreError::Cancelled.is_integrity_failure());
    }

    #[test]
    fn transport_errors_are_retryable() {
        let err = CoreError::DownloadFailed {
            url: "https://example.com/a".into(),
            status: 503,
        };
        assert!(err.is_retryable());
    }
}
