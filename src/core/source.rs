// ─── Download Source ───
// Endpoint policy: official upstream hosts or the BMCLAPI mirror.

use serde::{Deserialize, Serialize};

const OFFICIAL_MANIFEST: &str = "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
const OFFICIAL_ASSETS: &str = "https://resources.download.minecraft.net";
const OFFICIAL_LIBRARIES: &str = "https://libraries.minecraft.net";
const FABRIC_META: &str = "https://meta.fabricmc.net/v2";
const FABRIC_MAVEN: &str = "https://maven.fabricmc.net";
const QUILT_META: &str = "https://meta.quiltmc.org/v3";
const QUILT_MAVEN: &str = "https://maven.quiltmc.org/repository/release";
const BMCLAPI: &str = "https://bmclapi2.bangbang93.com";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Official,
    Bmclapi,
}

/// Resolved set of endpoints plus the host substitutions applied to URLs
/// found inside downloaded metadata.
#[derive(Debug, Clone)]
pub struct DownloadSource {
    kind: SourceKind,
    manifest_url: String,
    assets_base: String,
    fabric_meta: String,
    fabric_maven: String,
    quilt_meta: String,
    quilt_maven: String,
    /// OptiFine and other mirror-only payloads are always fetched here.
    mirror_base: String,
    host_rewrites: Vec<(String, String)>,
}

impl DownloadSource {
    pub fn official() -> Self {
        Self {
            kind: SourceKind::Official,
            manifest_url: OFFICIAL_MANIFEST.to_string(),
            assets_base: OFFICIAL_ASSETS.to_string(),
            fabric_meta: FABRIC_META.to_string(),
            fabric_maven: FABRIC_MAVEN.to_string(),
            quilt_meta: QUILT_META.to_string(),
            quilt_maven: QUILT_MAVEN.to_string(),
            mirror_base: BMCLAPI.to_string(),
            host_rewrites: Vec::new(),
        }
    }

    pub fn bmclapi() -> Self {
        let rewrites = [
            ("https://piston-meta.mojang.com", BMCLAPI.to_string()),
            ("https://launchermeta.mojang.com", BMCLAPI.to_string()),
            ("https://launcher.mojang.com", BMCLAPI.to_string()),
            ("https://piston-data.mojang.com", BMCLAPI.to_string()),
            (OFFICIAL_ASSETS, format!("{BMCLAPI}/assets")),
            (OFFICIAL_LIBRARIES, format!("{BMCLAPI}/maven")),
            (FABRIC_META, format!("{BMCLAPI}/fabric-meta/v2")),
            (FABRIC_MAVEN, format!("{BMCLAPI}/maven")),
            ("https://maven.minecraftforge.net", format!("{BMCLAPI}/maven")),
            ("https://maven.neoforged.net/releases", format!("{BMCLAPI}/maven")),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to))
        .collect();

        Self {
            kind: SourceKind::Bmclapi,
            manifest_url: format!("{BMCLAPI}/mc/game/version_manifest_v2.json"),
            assets_base: format!("{BMCLAPI}/assets"),
            fabric_meta: format!("{BMCLAPI}/fabric-meta/v2"),
            fabric_maven: format!("{BMCLAPI}/maven"),
            quilt_meta: QUILT_META.to_string(),
            quilt_maven: QUILT_MAVEN.to_string(),
            mirror_base: BMCLAPI.to_string(),
            host_rewrites: rewrites,
        }
    }

    pub fn from_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Official => Self::official(),
            SourceKind::Bmclapi => Self::bmclapi(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    pub fn fabric_meta(&self) -> &str {
        &self.fabric_meta
    }

    pub fn fabric_maven(&self) -> &str {
        &self.fabric_maven
    }

    pub fn quilt_meta(&self) -> &str {
        &self.quilt_meta
    }

    pub fn quilt_maven(&self) -> &str {
        &self.quilt_maven
    }

    pub fn mirror_base(&self) -> &str {
        &self.mirror_base
    }

    /// Content-addressed asset object URL: `<base>/<hash[0:2]>/<hash>`.
    pub fn asset_url(&self, hash: &str) -> String {
        let prefix = hash.get(..2).unwrap_or(hash);
        format!(
            "{}/{}/{}",
            self.assets_base.trim_end_matches('/'),
            prefix,
            hash
        )
    }

    /// Apply host substitutions to a URL taken from upstream metadata.
    pub fn rewrite(&self, url: &str) -> String {
        for (from, to) in &self.host_rewrites {
            if let Some(rest) = url.strip_prefix(from.as_str()) {
                return format!("{to}{rest}");
            }
        }
        url.to_string()
    }

    // ── Endpoint overrides (self-hosted mirrors, tests) ──

    pub fn with_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.manifest_url = url.into();
        self
    }

    pub fn with_assets_base(mut self, url: impl Into<String>) -> Self {
        self.assets_base = url.into();
        self
    }

    pub fn with_fabric_endpoints(mut self, meta: impl Into<String>, maven: impl Into<String>) -> Self {
        self.fabric_meta = meta.into();
        self.fabric_maven = maven.into();
        self
    }

    pub fn with_quilt_endpoints(mut self, meta: impl Into<String>, maven: impl Into<String>) -> Self {
        self.quilt_meta = meta.into();
        self.quilt_maven = maven.into();
        self
    }

    pub fn with_mirror_base(mut self, url: impl Into<String>) -> Self {
        self.mirror_base = url.into();
        self
    }

    pub fn with_rewrite(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.host_rewrites.push((from.into(), to.into()));
        self
    }
}

impl Default for DownloadSource {
    fn default() -> Self {
        Self::official()
    }
}
