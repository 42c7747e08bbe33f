use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::config::DEFAULT_MAX_CONCURRENCY;
use crate::core::downloader::{
    BatchDownloadCoordinator, DownloadResult, DownloadTask, HashVerifier,
};
use crate::core::error::{CoreError, CoreResult};
use crate::core::progress::{ProgressReporter, StatusCallback};
use crate::core::source::DownloadSource;
use crate::core::version::{VersionInfo, VersionInfoResolver};

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

/// Outcome of one asset sync pass. Partial sets are a normal result.
#[derive(Debug)]
pub struct AssetSyncReport {
    pub index_id: String,
    /// Distinct objects (by hash) referenced by the index.
    pub total_objects: usize,
    pub already_present: usize,
    pub downloaded: usize,
    pub failed: Vec<DownloadResult>,
}

impl AssetSyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keeps `assets/indexes` and `assets/objects` in step with a version's
/// asset index. Every call re-checks what is on disk, so repeated calls
/// only fetch what is still missing.
pub struct AssetIndexSynchronizer {
    coordinator: Arc<BatchDownloadCoordinator>,
    resolver: Arc<VersionInfoResolver>,
    source: DownloadSource,
    concurrency: usize,
}

impl AssetIndexSynchronizer {
    pub fn new(
        coordinator: Arc<BatchDownloadCoordinator>,
        resolver: Arc<VersionInfoResolver>,
        source: DownloadSource,
    ) -> Self {
        Self {
            coordinator,
            resolver,
            source,
            concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn index_path(local_dir: &Path, index_id: &str) -> PathBuf {
        local_dir
            .join("assets")
            .join("indexes")
            .join(format!("{index_id}.json"))
    }

    pub fn object_path(local_dir: &Path, hash: &str) -> PathBuf {
        let prefix = hash.get(..2).unwrap_or(hash);
        local_dir
            .join("assets")
            .join("objects")
            .join(prefix)
            .join(hash)
    }

    /// Make sure the asset index referenced by `version_info` is on disk and
    /// valid, downloading it otherwise.
    pub async fn ensure_asset_index(
        &self,
        version_id: &str,
        version_info: &VersionInfo,
        local_dir: &Path,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let Some(index_ref) = &version_info.asset_index else {
            debug!("{} has no asset index reference", version_id);
            progress.report(100.0);
            return Ok(());
        };

        let path = Self::index_path(local_dir, &index_ref.id);
        if index_is_valid(&path, index_ref.sha1.as_deref()).await {
            debug!("Asset index {} is up to date", index_ref.id);
            progress.report(100.0);
            return Ok(());
        }

        info!("Downloading asset index {} for {}", index_ref.id, version_id);
        let mut task = DownloadTask::new(self.source.rewrite(&index_ref.url), &path)
            .with_description(format!("asset index {}", index_ref.id));
        if let Some(sha1) = &index_ref.sha1 {
            task = task.with_digest(sha1.clone());
        }

        let sink = progress.clone();
        let on_progress: StatusCallback = Arc::new(move |status| sink.report(status.percent));
        self.coordinator
            .download_one(&task, Some(&on_progress), cancel)
            .await?
            .into_outcome()?;

        progress.report(100.0);
        Ok(())
    }

    /// Download every asset object of `version_id` that is missing or has
    /// the wrong size.
    ///
    /// Individual object failures are logged and returned in the report;
    /// only cancellation and index-level failures are errors.
    pub async fn sync_all_asset_objects(
        &self,
        version_id: &str,
        local_dir: &Path,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> CoreResult<AssetSyncReport> {
        let info = self
            .resolver
            .get_version_info(version_id, Some(local_dir), true, cancel)
            .await?;
        let index_id = info.asset_index_id().to_string();
        let index_path = Self::index_path(local_dir, &index_id);

        // Replaces any index that fails validation; a valid one costs no
        // request.
        self.ensure_asset_index(version_id, &info, local_dir, &progress.scoped(0.0, 5.0), cancel)
            .await?;

        let index = load_index(&index_path).await?;

        let mut seen = HashSet::new();
        let unique: Vec<&AssetObject> = index
            .objects
            .values()
            .filter(|object| seen.insert(object.hash.as_str()))
            .collect();
        let total_objects = unique.len();

        let mut tasks = Vec::new();
        for object in unique {
            let target = Self::object_path(local_dir, &object.hash);
            if HashVerifier::matches_size(&target, object.size).await {
                continue;
            }
            tasks.push(
                DownloadTask::new(self.source.asset_url(&object.hash), target)
                    .with_digest(object.hash.clone())
                    .with_size(object.size)
                    .with_description(format!("asset {}", object.hash)),
            );
        }

        let already_present = total_objects - tasks.len();
        info!(
            "Asset index {}: {} objects, {} already present, {} to download",
            index_id,
            total_objects,
            already_present,
            tasks.len()
        );

        let results = self
            .coordinator
            .download_many(tasks, self.concurrency, &progress.scoped(5.0, 100.0), cancel)
            .await?;

        let (ok, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.success);
        if !failed.is_empty() {
            warn!(
                "{} of {} asset downloads failed for index {}",
                failed.len(),
                ok.len() + failed.len(),
                index_id
            );
        }

        Ok(AssetSyncReport {
            index_id,
            total_objects,
            already_present,
            downloaded: ok.len(),
            failed,
        })
    }
}

async fn load_index(path: &Path) -> CoreResult<AssetIndex> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Exists, parses, and matches `expected_sha1` when one is known.
async fn index_is_valid(path: &Path, expected_sha1: Option<&str>) -> bool {
    let Ok(raw) = tokio::fs::read_to_string(path).await else {
        return false;
    };
    if serde_json::from_str::<serde_json::Value>(&raw).is_err() {
        warn!("Asset index {:?} is not valid JSON", path);
        return false;
    }
    match expected_sha1 {
        Some(expected) => HashVerifier::matches(path, expected).await,
        None => true,
    }
}
