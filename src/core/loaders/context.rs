use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::core::progress::ProgressReporter;

/// Everything a base loader installer needs for one install.
pub struct BaseInstallContext<'a> {
    pub minecraft_version: &'a str,
    pub loader_version: &'a str,
    pub game_dir: &'a Path,
    /// Id to write the version under; installers pick their own when `None`.
    pub custom_version_name: Option<&'a str>,
    /// Set when installing additively into a version that already exists.
    pub existing_version: Option<&'a str>,
    pub progress: &'a ProgressReporter,
    pub cancel: &'a CancellationToken,
}

pub struct AddonInstallContext<'a> {
    pub minecraft_version: &'a str,
    pub addon_version: &'a str,
    pub game_dir: &'a Path,
    /// Version directory the addon is installed into.
    pub target_version: &'a str,
    pub progress: &'a ProgressReporter,
    pub cancel: &'a CancellationToken,
}
