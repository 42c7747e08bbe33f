// ─── OptiFine (addon) ───
// Installed as a mod jar into an existing version's `mods/` directory.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::context::AddonInstallContext;
use super::installer::AddonInstaller;
use crate::core::downloader::{BatchDownloadCoordinator, DownloadTask};
use crate::core::error::{CoreError, CoreResult};
use crate::core::progress::StatusCallback;
use crate::core::source::DownloadSource;

pub struct OptiFineAddonInstaller {
    coordinator: Arc<BatchDownloadCoordinator>,
    mirror_base: String,
}

impl OptiFineAddonInstaller {
    pub fn new(coordinator: Arc<BatchDownloadCoordinator>, source: &DownloadSource) -> Self {
        Self {
            coordinator,
            mirror_base: source.mirror_base().to_string(),
        }
    }

    /// Split `HD_U:I5` (or the filesystem-safe `HD_U_I5`) into the edition
    /// and patch parts.
    pub fn split_version(version: &str) -> CoreResult<(&str, &str)> {
        let split = version
            .split_once(':')
            .or_else(|| version.rsplit_once('_'))
            .filter(|(edition, patch)| !edition.is_empty() && !patch.is_empty());
        split.ok_or_else(|| CoreError::Loader(format!("Unrecognised OptiFine version: {version}")))
    }

    pub fn download_url(&self, minecraft_version: &str, edition: &str, patch: &str) -> String {
        format!(
            "{}/optifine/{}/{}/{}",
            self.mirror_base.trim_end_matches('/'),
            minecraft_version,
            edition,
            patch
        )
    }

    pub fn mods_dir(game_dir: &Path, target_version: &str) -> PathBuf {
        game_dir.join("versions").join(target_version).join("mods")
    }
}

#[async_trait]
impl AddonInstaller for OptiFineAddonInstaller {
    async fn install_addon(&self, ctx: AddonInstallContext<'_>) -> CoreResult<()> {
        let (edition, patch) = Self::split_version(ctx.addon_version)?;
        info!(
            "Installing OptiFine {} {} into {}",
            edition, patch, ctx.target_version
        );
        ctx.progress.report(0.0);

        let mods_dir = Self::mods_dir(ctx.game_dir, ctx.target_version);
        let file_name = format!("OptiFine_{}_{}_{}.jar", ctx.minecraft_version, edition, patch);
        let target = mods_dir.join(&file_name);

        let task = DownloadTask::new(
            self.download_url(ctx.minecraft_version, edition, patch),
            &target,
        )
        .with_description(file_name.clone());

        let sink = ctx.progress.scoped(0.0, 90.0);
        let on_progress: StatusCallback = Arc::new(move |status| sink.report(status.percent));
        self.coordinator
            .download_one(&task, Some(&on_progress), ctx.cancel)
            .await?
            .into_outcome()?;

        // Mirrors answer unknown builds with an HTML page and a 200.
        if let Err(e) = validate_jar(&target).await {
            warn!("Downloaded OptiFine payload is not a jar: {}", e);
            if let Err(remove) = tokio::fs::remove_file(&target).await {
                debug!("Could not remove invalid payload {:?}: {}", target, remove);
            }
            return Err(e);
        }

        remove_previous_builds(&mods_dir, &file_name).await?;
        ctx.progress.report(100.0);
        info!("OptiFine installed as {:?}", target);
        Ok(())
    }
}

async fn validate_jar(path: &Path) -> CoreResult<()> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;
    let archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    if archive.len() == 0 {
        return Err(CoreError::Loader(format!("{path:?} is an empty archive")));
    }
    Ok(())
}

/// Delete every `OptiFine*.jar` in `mods_dir` except `keep`.
async fn remove_previous_builds(mods_dir: &Path, keep: &str) -> CoreResult<()> {
    let mut entries = tokio::fs::read_dir(mods_dir)
        .await
        .map_err(|e| CoreError::io(mods_dir, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CoreError::io(mods_dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == keep || !name.starts_with("OptiFine") || !name.ends_with(".jar") {
            continue;
        }
        let path = entry.path();
        info!("Removing previous OptiFine build {}", name);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| CoreError::io(&path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn split_version_accepts_both_spellings() {
        assert_eq!(
            OptiFineAddonInstaller::split_version("HD_U:I5").unwrap(),
            ("HD_U", "I5")
        );
        assert_eq!(
            OptiFineAddonInstaller::split_version("HD_U_I5").unwrap(),
            ("HD_U", "I5")
        );
        assert!(OptiFineAddonInstaller::split_version("I5").is_err());
    }

    #[test]
    fn download_url_targets_mirror() {
        let coordinator = Arc::new(BatchDownloadCoordinator::new(
            Arc::new(crate::core::downloader::TransferEngine::new(Default::default())),
            Default::default(),
        ));
        let installer = OptiFineAddonInstaller::new(coordinator, &DownloadSource::official());
        assert_eq!(
            installer.download_url("1.20.1", "HD_U", "I5"),
            "https://bmclapi2.bangbang93.com/optifine/1.20.1/HD_U/I5"
        );
    }

    #[tokio::test]
    async fn html_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("OptiFine.jar");
        tokio::fs::write(&path, b"<html>Not found</html>").await.unwrap();
        assert!(validate_jar(&path).await.is_err());
    }

    #[tokio::test]
    async fn valid_jar_passes_and_old_builds_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let keep = "OptiFine_1.20.1_HD_U_I5.jar";
        let path = dir.path().join(keep);

        let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        writer
            .start_file("optifine/Config.class", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"cafebabe").unwrap();
        writer.finish().unwrap();

        std::fs::write(dir.path().join("OptiFine_1.20.1_HD_U_I3.jar"), b"old").unwrap();
        std::fs::write(dir.path().join("sodium.jar"), b"other").unwrap();

        validate_jar(&path).await.unwrap();
        remove_previous_builds(dir.path(), keep).await.unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("OptiFine_1.20.1_HD_U_I3.jar").exists());
        assert!(dir.path().join("sodium.jar").exists());
    }
}
