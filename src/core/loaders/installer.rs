use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::context::{AddonInstallContext, BaseInstallContext};
use super::fabric::ProfileLoaderInstaller;
use super::optifine::OptiFineAddonInstaller;
use crate::core::downloader::BatchDownloadCoordinator;
use crate::core::error::{CoreError, CoreResult};
use crate::core::http::ApiClient;
use crate::core::source::DownloadSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    Fabric,
    Quilt,
    Forge,
    NeoForge,
    LiteLoader,
    OptiFine,
}

impl LoaderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderType::Fabric => "fabric",
            LoaderType::Quilt => "quilt",
            LoaderType::Forge => "forge",
            LoaderType::NeoForge => "neoforge",
            LoaderType::LiteLoader => "liteloader",
            LoaderType::OptiFine => "optifine",
        }
    }
}

impl fmt::Display for LoaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a combo install plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModLoaderSelection {
    #[serde(rename = "type")]
    pub loader_type: LoaderType,
    pub version: String,
    #[serde(default)]
    pub is_addon: bool,
    #[serde(default)]
    pub install_order: i32,
}

impl ModLoaderSelection {
    pub fn base(loader_type: LoaderType, version: impl Into<String>, install_order: i32) -> Self {
        Self {
            loader_type,
            version: version.into(),
            is_addon: false,
            install_order,
        }
    }

    pub fn addon(loader_type: LoaderType, version: impl Into<String>, install_order: i32) -> Self {
        Self {
            is_addon: true,
            ..Self::base(loader_type, version, install_order)
        }
    }
}

/// Installs a loader that produces (or extends) a launchable version.
#[async_trait]
pub trait BaseLoaderInstaller: Send + Sync {
    /// Returns the id of the version directory that was written.
    async fn install(&self, ctx: BaseInstallContext<'_>) -> CoreResult<String>;
}

/// Installs a component into an existing version.
#[async_trait]
pub trait AddonInstaller: Send + Sync {
    async fn install_addon(&self, ctx: AddonInstallContext<'_>) -> CoreResult<()>;
}

/// Installer lookup by loader type, one table per capability.
#[derive(Default, Clone)]
pub struct LoaderRegistry {
    base: HashMap<LoaderType, Arc<dyn BaseLoaderInstaller>>,
    addons: HashMap<LoaderType, Arc<dyn AddonInstaller>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Fabric, Quilt and OptiFine installers.
    /// Forge, NeoForge and LiteLoader are registered by the host.
    pub fn with_defaults(
        api: ApiClient,
        coordinator: Arc<BatchDownloadCoordinator>,
        source: &DownloadSource,
    ) -> Self {
        let mut registry = Self::new();
        registry.register_base(
            LoaderType::Fabric,
            Arc::new(ProfileLoaderInstaller::fabric(
                api.clone(),
                coordinator.clone(),
                source,
            )),
        );
        registry.register_base(
            LoaderType::Quilt,
            Arc::new(ProfileLoaderInstaller::quilt(
                api,
                coordinator.clone(),
                source,
            )),
        );
        registry.register_addon(
            LoaderType::OptiFine,
            Arc::new(OptiFineAddonInstaller::new(coordinator, source)),
        );
        registry
    }

    pub fn register_base(
        &mut self,
        loader: LoaderType,
        installer: Arc<dyn BaseLoaderInstaller>,
    ) -> &mut Self {
        self.base.insert(loader, installer);
        self
    }

    pub fn register_addon(
        &mut self,
        loader: LoaderType,
        installer: Arc<dyn AddonInstaller>,
    ) -> &mut Self {
        self.addons.insert(loader, installer);
        self
    }

    pub fn base(&self, loader: LoaderType) -> CoreResult<Arc<dyn BaseLoaderInstaller>> {
        self.base
            .get(&loader)
            .cloned()
            .ok_or_else(|| CoreError::UnsupportedLoader {
                loader: loader.to_string(),
                mode: "base loader",
            })
    }

    pub fn addon(&self, loader: LoaderType) -> CoreResult<Arc<dyn AddonInstaller>> {
        self.addons
            .get(&loader)
            .cloned()
            .ok_or_else(|| CoreError::UnsupportedLoader {
                loader: loader.to_string(),
                mode: "addon",
            })
    }

    /// Check that every selection has an installer for its capability.
    pub fn validate(&self, selections: &[ModLoaderSelection]) -> CoreResult<()> {
        for selection in selections {
            if selection.is_addon {
                self.addon(selection.loader_type)?;
            } else {
                self.base(selection.loader_type)?;
            }
        }
        Ok(())
    }
}
