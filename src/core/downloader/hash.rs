use std::path::Path;

use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tokio::io::AsyncReadExt;

use crate::core::error::{CoreError, CoreResult};

/// Read buffer used when hashing files (64 KiB).
const HASH_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Md5,
}

impl HashAlgorithm {
    /// Infer the algorithm from the length of a hex digest.
    pub fn for_digest(expected: &str) -> CoreResult<Self> {
        if !expected.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::UnsupportedDigest(expected.to_string()));
        }
        match expected.len() {
            40 => Ok(Self::Sha1),
            64 => Ok(Self::Sha256),
            32 => Ok(Self::Md5),
            _ => Err(CoreError::UnsupportedDigest(expected.to_string())),
        }
    }
}

/// Content digests of local files.
pub struct HashVerifier;

impl HashVerifier {
    /// Compute the lowercase hex digest of the file at `path`.
    pub async fn compute(path: &Path, algorithm: HashAlgorithm) -> CoreResult<String> {
        match algorithm {
            HashAlgorithm::Sha1 => digest_file::<Sha1>(path).await,
            HashAlgorithm::Sha256 => digest_file::<Sha256>(path).await,
            HashAlgorithm::Md5 => digest_file::<Md5>(path).await,
        }
    }

    /// Recompute the digest of `path` and compare it with `expected`.
    ///
    /// Returns `DigestMismatch` carrying both values when they differ.
    pub async fn verify(path: &Path, expected: &str) -> CoreResult<()> {
        let algorithm = HashAlgorithm::for_digest(expected)?;
        let actual = Self::compute(path, algorithm).await?;
        if actual.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(CoreError::DigestMismatch {
                path: path.to_path_buf(),
                expected: expected.to_ascii_lowercase(),
                actual,
            })
        }
    }

    /// Convenience wrapper answering only "does it match".
    pub async fn matches(path: &Path, expected: &str) -> bool {
        Self::verify(path, expected).await.is_ok()
    }

    /// Presence check used for content-addressed objects: the file exists
    /// and has exactly `size` bytes.
    pub async fn matches_size(path: &Path, size: u64) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file() && meta.len() == size,
            Err(_) => false,
        }
    }
}

async fn digest_file<D: Digest>(path: &Path) -> CoreResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha1("hello world")
    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    #[test]
    fn algorithm_is_inferred_from_length() {
        assert_eq!(HashAlgorithm::for_digest(HELLO_SHA1).unwrap(), HashAlgorithm::Sha1);
        assert_eq!(
            HashAlgorithm::for_digest(&"a".repeat(64)).unwrap(),
            HashAlgorithm::Sha256
        );
        assert_eq!(HashAlgorithm::for_digest(&"b".repeat(32)).unwrap(), HashAlgorithm::Md5);
        assert!(HashAlgorithm::for_digest("abc").is_err());
        assert!(HashAlgorithm::for_digest(&"z".repeat(40)).is_err());
    }

    #[tokio::test]
    async fn verify_accepts_matching_digest_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        HashVerifier::verify(&path, HELLO_SHA1).await.unwrap();
        HashVerifier::verify(&path, &HELLO_SHA1.to_uppercase()).await.unwrap();
    }

    #[tokio::test]
    async fn verify_reports_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello world!").await.unwrap();

        let err = HashVerifier::verify(&path, HELLO_SHA1).await.unwrap_err();
        assert!(matches!(err, CoreError::DigestMismatch { .. }));
    }

    #[tokio::test]
    async fn size_check_requires_exact_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj");
        tokio::fs::write(&path, b"12345").await.unwrap();

        assert!(HashVerifier::matches_size(&path, 5).await);
        assert!(!HashVerifier::matches_size(&path, 6).await);
        assert!(!HashVerifier::matches_size(&dir.path().join("missing"), 5).await);
    }
}
