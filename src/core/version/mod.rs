mod manifest;
mod resolver;
mod schema;
mod version_file;

pub use manifest::{Clock, LatestVersions, SystemClock, VersionEntry, VersionManifest, VersionManifestCache};
pub use resolver::VersionInfoResolver;
pub use schema::migrate_descriptor;
pub use version_file::{
    Arguments, AssetIndexRef, DownloadArtifact, JavaVersionInfo, Library, LibraryDownloads,
    LibraryRule, OsRule, RuleAction, VersionInfo,
};
