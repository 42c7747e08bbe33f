// ─── Version Manifest ───
// Fetches the version manifest v2 and memoizes it for a fixed TTL.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::config::DEFAULT_MANIFEST_TTL_SECS;
use crate::core::error::CoreResult;
use crate::core::http::ApiClient;
use crate::core::source::DownloadSource;

/// Top-level version manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(rename = "releaseTime")]
    pub release_time: DateTime<Utc>,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// List all official stable versions (release only).
    pub fn releases(&self) -> Vec<&VersionEntry> {
        self.versions
            .iter()
            .filter(|v| v.version_type == "release")
            .collect()
    }
}

/// Time source for cache freshness.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CachedManifest {
    manifest: Arc<VersionManifest>,
    fetched_at: DateTime<Utc>,
}

/// Memoizes the manifest for `ttl` after the last successful fetch.
///
/// A failed refresh after expiry propagates the error; the expired copy is
/// not served.
pub struct VersionManifestCache {
    api: ApiClient,
    source: DownloadSource,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    cached: RwLock<Option<CachedManifest>>,
}

impl VersionManifestCache {
    pub fn new(api: ApiClient, source: DownloadSource) -> Self {
        Self {
            api,
            source,
            clock: Arc::new(SystemClock),
            ttl: chrono::Duration::seconds(DEFAULT_MANIFEST_TTL_SECS as i64),
            cached: RwLock::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn get_manifest(&self, cancel: &CancellationToken) -> CoreResult<Arc<VersionManifest>> {
        if let Some(fresh) = self.fresh().await {
            debug!("Serving cached version manifest");
            return Ok(fresh);
        }

        let url = self.source.manifest_url();
        info!("Fetching Minecraft version manifest from {}", url);
        let manifest: VersionManifest = self.api.fetch_json(url, cancel).await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());

        let manifest = Arc::new(manifest);
        *self.cached.write().await = Some(CachedManifest {
            manifest: manifest.clone(),
            fetched_at: self.clock.now(),
        });
        Ok(manifest)
    }

    /// Drop the cached copy so the next call refetches.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn fresh(&self) -> Option<Arc<VersionManifest>> {
        let guard = self.cached.read().await;
        let cached = guard.as_ref()?;
        (self.clock.now() - cached.fetched_at < self.ttl).then(|| cached.manifest.clone())
    }
}
