// ─── Version Resolver ───
// Resolves a version id to a fully merged descriptor: local first, then the
// manifest, walking `inheritsFrom` chains recursively.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::manifest::VersionManifestCache;
use super::version_file::VersionInfo;
use crate::core::downloader::{BatchDownloadCoordinator, DownloadTask};
use crate::core::error::{CoreError, CoreResult};
use crate::core::http::ApiClient;
use crate::core::source::DownloadSource;

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = CoreResult<VersionInfo>> + Send + 'a>>;

pub struct VersionInfoResolver {
    manifest: Arc<VersionManifestCache>,
    coordinator: Arc<BatchDownloadCoordinator>,
    api: ApiClient,
    source: DownloadSource,
}

impl VersionInfoResolver {
    pub fn new(
        manifest: Arc<VersionManifestCache>,
        coordinator: Arc<BatchDownloadCoordinator>,
        api: ApiClient,
        source: DownloadSource,
    ) -> Self {
        Self {
            manifest,
            coordinator,
            api,
            source,
        }
    }

    /// Resolve `version_id` into a descriptor with its inheritance chain
    /// merged in.
    ///
    /// A parent that cannot be resolved (including an inheritance cycle)
    /// leaves the child unmerged rather than failing the call.
    pub async fn get_version_info(
        &self,
        version_id: &str,
        local_dir: Option<&Path>,
        allow_network: bool,
        cancel: &CancellationToken,
    ) -> CoreResult<VersionInfo> {
        self.resolve(version_id.to_string(), local_dir, allow_network, cancel, Vec::new())
            .await
    }

    fn resolve<'a>(
        &'a self,
        version_id: String,
        local_dir: Option<&'a Path>,
        allow_network: bool,
        cancel: &'a CancellationToken,
        mut chain: Vec<String>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let child = self
                .load_single(&version_id, local_dir, allow_network, cancel)
                .await?;

            let Some(parent_id) = child.inherits_from.clone().filter(|p| !p.is_empty()) else {
                return Ok(child);
            };

            chain.push(version_id.clone());
            if chain.contains(&parent_id) {
                warn!(
                    "Inheritance cycle {} -> {}, returning {} unmerged",
                    chain.join(" -> "),
                    parent_id,
                    version_id
                );
                return Ok(child);
            }

            debug!("Resolving parent {} of {}", parent_id, version_id);
            match self
                .resolve(parent_id.clone(), local_dir, allow_network, cancel, chain)
                .await
            {
                Ok(parent) => Ok(child.merge_onto(&parent)),
                Err(CoreError::Cancelled) => Err(CoreError::Cancelled),
                Err(e) => {
                    warn!(
                        "Could not resolve parent {} of {}: {}; returning it unmerged",
                        parent_id, version_id, e
                    );
                    Ok(child)
                }
            }
        })
    }

    /// Load one descriptor without following `inheritsFrom`.
    async fn load_single(
        &self,
        version_id: &str,
        local_dir: Option<&Path>,
        allow_network: bool,
        cancel: &CancellationToken,
    ) -> CoreResult<VersionInfo> {
        if let Some(dir) = local_dir {
            let path = VersionInfo::descriptor_path(dir, version_id);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!("Loading local descriptor {:?}", path);
                return VersionInfo::load_from(&path, version_id).await;
            }
        }

        if !allow_network {
            return Err(CoreError::VersionNotFound(version_id.to_string()));
        }

        let manifest = self.manifest.get_manifest(cancel).await?;
        let entry = manifest
            .find_version(version_id)
            .ok_or_else(|| CoreError::VersionNotFound(version_id.to_string()))?;
        let url = self.source.rewrite(&entry.url);
        info!("Downloading version descriptor {} from {}", version_id, url);

        match local_dir {
            Some(dir) => {
                let path = VersionInfo::descriptor_path(dir, version_id);
                let mut task = DownloadTask::new(url, &path)
                    .with_description(format!("version descriptor {version_id}"));
                if let Some(sha1) = &entry.sha1 {
                    task = task.with_digest(sha1.clone());
                }
                self.coordinator
                    .download_one(&task, None, cancel)
                    .await?
                    .into_outcome()?;
                VersionInfo::load_from(&path, version_id).await
            }
            None => {
                let raw = self.api.fetch_text(&url, cancel).await?;
                VersionInfo::parse(&raw, version_id)
            }
        }
    }
}
