// ─── Profile Loader Installer ───
// Fabric and Quilt publish a ready-made version descriptor ("profile") per
// (minecraft, loader) pair. Installing means writing that descriptor and
// fetching the Maven libraries it lists.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::BaseInstallContext;
use super::installer::{BaseLoaderInstaller, LoaderType};
use crate::core::downloader::{BatchDownloadCoordinator, DownloadTask};
use crate::core::error::{CoreError, CoreResult};
use crate::core::http::ApiClient;
use crate::core::maven::MavenArtifact;
use crate::core::source::DownloadSource;
use crate::core::version::{Library, VersionInfo};

pub struct ProfileLoaderInstaller {
    flavor: LoaderType,
    meta_base: String,
    maven_base: String,
    loader_group: &'static str,
    api: ApiClient,
    coordinator: Arc<BatchDownloadCoordinator>,
    source: DownloadSource,
}

impl ProfileLoaderInstaller {
    pub fn fabric(
        api: ApiClient,
        coordinator: Arc<BatchDownloadCoordinator>,
        source: &DownloadSource,
    ) -> Self {
        Self {
            flavor: LoaderType::Fabric,
            meta_base: source.fabric_meta().to_string(),
            maven_base: source.fabric_maven().to_string(),
            loader_group: "net.fabricmc:fabric-loader",
            api,
            coordinator,
            source: source.clone(),
        }
    }

    pub fn quilt(
        api: ApiClient,
        coordinator: Arc<BatchDownloadCoordinator>,
        source: &DownloadSource,
    ) -> Self {
        Self {
            flavor: LoaderType::Quilt,
            meta_base: source.quilt_meta().to_string(),
            maven_base: source.quilt_maven().to_string(),
            loader_group: "org.quiltmc:quilt-loader",
            api,
            coordinator,
            source: source.clone(),
        }
    }

    pub fn profile_url(&self, minecraft_version: &str, loader_version: &str) -> String {
        format!(
            "{}/versions/loader/{}/{}/profile/json",
            self.meta_base.trim_end_matches('/'),
            minecraft_version,
            loader_version
        )
    }

    async fn fetch_profile(
        &self,
        minecraft_version: &str,
        loader_version: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<VersionInfo> {
        let url = self.profile_url(minecraft_version, loader_version);
        let raw = match self.api.fetch_text(&url, cancel).await {
            Ok(raw) => raw,
            Err(CoreError::DownloadFailed { status, .. }) => {
                return Err(CoreError::LoaderApi(format!(
                    "{} meta returned {} for {}",
                    self.flavor, status, url
                )))
            }
            Err(e) => return Err(e),
        };

        let fallback_id = format!("{}-loader-{}-{}", self.flavor, loader_version, minecraft_version);
        let profile = VersionInfo::parse(&raw, &fallback_id)?;

        if profile.main_class.as_deref().map_or(true, str::is_empty) {
            return Err(CoreError::LoaderApi(format!(
                "{} profile missing mainClass",
                self.flavor
            )));
        }

        Ok(profile)
    }

    /// Add the loader jar itself when the profile does not list it.
    fn ensure_loader_artifact(&self, libraries: &mut Vec<Library>, loader_version: &str) {
        let coord = format!("{}:{}", self.loader_group, loader_version);
        if libraries.iter().any(|lib| lib.name == coord) {
            return;
        }
        let mut loader = Library::new(coord);
        loader.url = Some(self.maven_base.clone());
        libraries.push(loader);
    }

    fn library_tasks(&self, libraries: &[Library], libs_dir: &Path) -> CoreResult<Vec<DownloadTask>> {
        let mut tasks = Vec::new();
        for lib in libraries {
            if !lib.is_allowed_for_current_os() {
                debug!("Skipping library (OS rule): {}", lib.name);
                continue;
            }

            let artifact = MavenArtifact::parse(&lib.name)?;
            let repo = lib.url.as_deref().unwrap_or(&self.maven_base);
            let mut task = DownloadTask::new(
                self.source.rewrite(&artifact.url(repo)),
                libs_dir.join(artifact.local_path()),
            )
            .with_description(lib.name.clone());
            if let Some(sha1) = &lib.sha1 {
                task = task.with_digest(sha1.clone());
            }
            if let Some(size) = lib.size {
                task = task.with_size(size);
            }
            tasks.push(task);
        }
        Ok(tasks)
    }

    async fn install_libraries(
        &self,
        libraries: &[Library],
        game_dir: &Path,
        ctx: &BaseInstallContext<'_>,
    ) -> CoreResult<()> {
        let libs_dir = game_dir.join("libraries");
        let mut pending = Vec::new();
        for task in self.library_tasks(libraries, &libs_dir)? {
            if tokio::fs::try_exists(&task.target_path).await.unwrap_or(false) {
                continue;
            }
            pending.push(task);
        }

        info!("{} library downloads pending for {}", pending.len(), self.flavor);
        let results = self
            .coordinator
            .download_many(pending, 0, &ctx.progress.scoped(10.0, 90.0), ctx.cancel)
            .await?;

        let failed: Vec<_> = results.into_iter().filter(|r| !r.success).collect();
        if let Some(first) = failed.first() {
            warn!("{} {} libraries failed to download", failed.len(), self.flavor);
            return Err(CoreError::Loader(format!(
                "{} of the {} libraries failed, first: {} ({})",
                failed.len(),
                self.flavor,
                first.url,
                first.error_message.as_deref().unwrap_or("unknown error")
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseLoaderInstaller for ProfileLoaderInstaller {
    async fn install(&self, ctx: BaseInstallContext<'_>) -> CoreResult<String> {
        info!(
            "Installing {} {} for Minecraft {}",
            self.flavor, ctx.loader_version, ctx.minecraft_version
        );
        ctx.progress.report(0.0);

        let mut profile = self
            .fetch_profile(ctx.minecraft_version, ctx.loader_version, ctx.cancel)
            .await?;
        self.ensure_loader_artifact(&mut profile.libraries, ctx.loader_version);
        ctx.progress.report(10.0);

        self.install_libraries(&profile.libraries, ctx.game_dir, &ctx)
            .await?;

        let descriptor = match ctx.existing_version {
            Some(existing) => {
                let path = VersionInfo::descriptor_path(ctx.game_dir, existing);
                let base = VersionInfo::load_from(&path, existing).await?;
                debug!("Merging {} profile into existing version {}", self.flavor, existing);
                profile.id = existing.to_string();
                profile.inherits_from = None;
                profile.merge_onto(&base)
            }
            None => {
                if let Some(name) = ctx.custom_version_name {
                    profile.id = name.to_string();
                }
                if profile.inherits_from.is_none() {
                    profile.inherits_from = Some(ctx.minecraft_version.to_string());
                }
                profile
            }
        };

        descriptor.save_to(ctx.game_dir).await?;
        ctx.progress.report(100.0);
        info!("{} installed as {}", self.flavor, descriptor.id);
        Ok(descriptor.id)
    }
}
