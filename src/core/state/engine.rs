use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::core::assets::AssetIndexSynchronizer;
use crate::core::config::EngineConfig;
use crate::core::downloader::{BatchDownloadCoordinator, RetryPolicy, TransferEngine};
use crate::core::error::CoreResult;
use crate::core::http::ApiClient;
use crate::core::loaders::{LoaderRegistry, MultiLoaderInstallOrchestrator};
use crate::core::source::DownloadSource;
use crate::core::version::{VersionInfoResolver, VersionManifestCache};

/// One fully wired engine: a single HTTP client, transfer engine,
/// coordinator and manifest cache shared by every component.
pub struct Engine {
    config: EngineConfig,
    source: DownloadSource,
    api: ApiClient,
    coordinator: Arc<BatchDownloadCoordinator>,
    manifest: Arc<VersionManifestCache>,
    resolver: Arc<VersionInfoResolver>,
    assets: Arc<AssetIndexSynchronizer>,
    orchestrator: Arc<MultiLoaderInstallOrchestrator>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> CoreResult<Self> {
        let source = DownloadSource::from_kind(config.download_source);
        Self::with_source(config, source)
    }

    /// Wire the engine against explicit endpoints (self-hosted mirrors).
    pub fn with_source(config: EngineConfig, source: DownloadSource) -> CoreResult<Self> {
        Self::with_registry(config, source, |_| {})
    }

    /// Like [`with_source`](Self::with_source) but lets the host register
    /// extra installers (Forge, NeoForge, LiteLoader) on top of the defaults.
    pub fn with_registry(
        config: EngineConfig,
        source: DownloadSource,
        extend: impl FnOnce(&mut LoaderRegistry),
    ) -> CoreResult<Self> {
        let config = config.normalized();
        let api = ApiClient::from_config(&config)?;
        Ok(Self::assemble(config, source, api, extend))
    }

    fn assemble(
        config: EngineConfig,
        source: DownloadSource,
        api: ApiClient,
        extend: impl FnOnce(&mut LoaderRegistry),
    ) -> Self {
        let coordinator = Arc::new(
            BatchDownloadCoordinator::new(
                Arc::new(TransferEngine::new(api.clone())),
                RetryPolicy::from_config(&config),
            )
            .with_default_concurrency(config.max_concurrency),
        );

        let manifest = Arc::new(
            VersionManifestCache::new(api.clone(), source.clone()).with_ttl(config.manifest_ttl()),
        );
        let resolver = Arc::new(VersionInfoResolver::new(
            manifest.clone(),
            coordinator.clone(),
            api.clone(),
            source.clone(),
        ));
        let assets = Arc::new(
            AssetIndexSynchronizer::new(coordinator.clone(), resolver.clone(), source.clone())
                .with_concurrency(config.max_concurrency),
        );

        let mut registry = LoaderRegistry::with_defaults(api.clone(), coordinator.clone(), &source);
        extend(&mut registry);
        let orchestrator = Arc::new(MultiLoaderInstallOrchestrator::new(Arc::new(registry)));

        info!(
            "Engine ready: source={:?}, game_dir={:?}, concurrency={}",
            source.kind(),
            config.game_dir,
            config.max_concurrency
        );

        Self {
            config,
            source,
            api,
            coordinator,
            manifest,
            resolver,
            assets,
            orchestrator,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn game_dir(&self) -> &Path {
        &self.config.game_dir
    }

    pub fn source(&self) -> &DownloadSource {
        &self.source
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn coordinator(&self) -> Arc<BatchDownloadCoordinator> {
        self.coordinator.clone()
    }

    pub fn manifest(&self) -> Arc<VersionManifestCache> {
        self.manifest.clone()
    }

    pub fn resolver(&self) -> Arc<VersionInfoResolver> {
        self.resolver.clone()
    }

    pub fn assets(&self) -> Arc<AssetIndexSynchronizer> {
        self.assets.clone()
    }

    pub fn orchestrator(&self) -> Arc<MultiLoaderInstallOrchestrator> {
        self.orchestrator.clone()
    }
}
