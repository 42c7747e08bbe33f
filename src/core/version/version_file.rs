// ─── Version File ───
// Typed version descriptor, inheritance merge, and on-disk persistence.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::schema::migrate_descriptor;
use crate::core::error::{CoreError, CoreResult};

/// A version descriptor (`versions/<id>/<id>.json`).
///
/// Keys this engine does not model are kept in `extra` so they survive a
/// merge and a save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexRef>,
    /// Legacy asset index id used before `assetIndex` existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub downloads: BTreeMap<String, DownloadArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    /// Pre-1.13 argument string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub version_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub major_version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Value>,
    #[serde(default)]
    pub jvm: Vec<Value>,
}

// ─── Library Entry with Rules ───

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    /// Maven repository base, used by loader profiles instead of `downloads`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<LibraryRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<DownloadArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            downloads: None,
            url: None,
            sha1: None,
            size: None,
            rules: None,
            natives: None,
            extra: Map::new(),
        }
    }

    /// Evaluate whether this library should be included for the current OS.
    ///
    /// No rules means allowed. Otherwise rules are applied top to bottom
    /// starting from "disallowed"; the last matching rule decides.
    pub fn is_allowed_for_current_os(&self) -> bool {
        let Some(rules) = &self.rules else {
            return true;
        };

        let current_os = current_os_name();
        rules.iter().fold(false, |allowed, rule| {
            let os_matches = rule
                .os
                .as_ref()
                .and_then(|os| os.name.as_deref())
                .map_or(true, |name| name == current_os);
            if os_matches {
                rule.action == RuleAction::Allow
            } else {
                allowed
            }
        })
    }
}

/// Get the Mojang OS name for the current platform.
fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl VersionInfo {
    /// Parse a descriptor, migrating legacy key spellings first.
    ///
    /// `fallback_id` fills in the id when the document has none.
    pub fn parse(raw: &str, fallback_id: &str) -> CoreResult<Self> {
        let invalid = |reason: String| CoreError::InvalidDescriptor {
            id: fallback_id.to_string(),
            reason,
        };

        let mut value: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        if !value.is_object() {
            return Err(invalid("descriptor is not a JSON object".to_string()));
        }
        migrate_descriptor(&mut value);

        let mut info: VersionInfo =
            serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
        if info.id.is_empty() {
            info.id = fallback_id.to_string();
        }
        Ok(info)
    }

    /// Merge this (child) descriptor onto its resolved parent.
    ///
    /// Non-empty child fields always win. Libraries are parent then child,
    /// de-duplicated by name keeping the last occurrence. Merging a
    /// descriptor with itself returns it unchanged.
    pub fn merge_onto(self, parent: &VersionInfo) -> VersionInfo {
        let mut extra = parent.extra.clone();
        extra.extend(self.extra);

        let mut downloads = parent.downloads.clone();
        downloads.extend(self.downloads);

        VersionInfo {
            id: if self.id.is_empty() {
                parent.id.clone()
            } else {
                self.id
            },
            inherits_from: parent.inherits_from.clone(),
            main_class: non_empty(self.main_class).or_else(|| parent.main_class.clone()),
            libraries: merge_libraries(&parent.libraries, self.libraries),
            asset_index: self.asset_index.or_else(|| parent.asset_index.clone()),
            assets: non_empty(self.assets).or_else(|| parent.assets.clone()),
            downloads,
            java_version: self.java_version.or_else(|| parent.java_version.clone()),
            arguments: merge_arguments(parent.arguments.as_ref(), self.arguments),
            minecraft_arguments: non_empty(self.minecraft_arguments)
                .or_else(|| parent.minecraft_arguments.clone()),
            version_type: non_empty(self.version_type).or_else(|| parent.version_type.clone()),
            release_time: non_empty(self.release_time).or_else(|| parent.release_time.clone()),
            time: non_empty(self.time).or_else(|| parent.time.clone()),
            jar: non_empty(self.jar).or_else(|| parent.jar.clone()),
            extra,
        }
    }

    /// Asset index id: explicit reference, then legacy `assets`, then
    /// the version id itself.
    pub fn asset_index_id(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|index| index.id.as_str())
            .filter(|id| !id.is_empty())
            .or(self.assets.as_deref().filter(|id| !id.is_empty()))
            .unwrap_or(&self.id)
    }

    pub fn descriptor_path(game_dir: &Path, id: &str) -> PathBuf {
        game_dir
            .join("versions")
            .join(id)
            .join(format!("{id}.json"))
    }

    pub async fn load_from(path: &Path, fallback_id: &str) -> CoreResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        Self::parse(&raw, fallback_id)
    }

    /// Write `versions/<id>/<id>.json` under `game_dir` through a staging file.
    pub async fn save_to(&self, game_dir: &Path) -> CoreResult<PathBuf> {
        let path = Self::descriptor_path(game_dir, &self.id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let staged = path.with_extension("json.tmp");
        tokio::fs::write(&staged, json)
            .await
            .map_err(|e| CoreError::io(&staged, e))?;
        tokio::fs::rename(&staged, &path)
            .await
            .map_err(|e| CoreError::io(&path, e))?;

        debug!("Saved version descriptor {:?}", path);
        Ok(path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn merge_libraries(parent: &[Library], child: Vec<Library>) -> Vec<Library> {
    let combined: Vec<Library> = parent.iter().cloned().chain(child).collect();

    let mut seen = HashSet::new();
    let mut kept: Vec<Library> = combined
        .into_iter()
        .rev()
        .filter(|lib| seen.insert(lib.name.clone()))
        .collect();
    kept.reverse();
    kept
}

fn merge_arguments(parent: Option<&Arguments>, child: Option<Arguments>) -> Option<Arguments> {
    match (parent, child) {
        (None, child) => child,
        (Some(parent), None) => Some(parent.clone()),
        (Some(parent), Some(child)) => Some(Arguments {
            game: merge_argument_list(&parent.game, child.game),
            jvm: merge_argument_list(&parent.jvm, child.jvm),
        }),
    }
}

fn merge_argument_list(parent: &[Value], child: Vec<Value>) -> Vec<Value> {
    if child.as_slice() == parent {
        return child;
    }
    parent.iter().cloned().chain(child).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vanilla() -> VersionInfo {
        VersionInfo::parse(
            &json!({
                "id": "1.20.1",
                "mainClass": "net.minecraft.client.main.Main",
                "type": "release",
                "assets": "5",
                "assetIndex": {"id": "5", "url": "https://x/5.json", "sha1": "aa", "totalSize": 10},
                "libraries": [
                    {"name": "org.ow2.asm:asm:9.3"},
                    {"name": "com.mojang:brigadier:1.1.8"}
                ],
                "arguments": {"game": ["--username"], "jvm": ["-Xss1M"]},
                "complianceLevel": 1
            })
            .to_string(),
            "1.20.1",
        )
        .unwrap()
    }

    fn fabric_child() -> VersionInfo {
        VersionInfo::parse(
            &json!({
                "id": "fabric-loader-0.15.0-1.20.1",
                "inheritsFrom": "1.20.1",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "libraries": [
                    {"name": "org.ow2.asm:asm:9.3", "url": "https://maven.fabricmc.net/"},
                    {"name": "net.fabricmc:fabric-loader:0.15.0", "url": "https://maven.fabricmc.net/"}
                ],
                "arguments": {"jvm": ["-DFabricMcEmu=net.minecraft.client.main.Main"]}
            })
            .to_string(),
            "ignored",
        )
        .unwrap()
    }

    #[test]
    fn child_scalars_win_and_parent_fills_gaps() {
        let merged = fabric_child().merge_onto(&vanilla());
        assert_eq!(merged.id, "fabric-loader-0.15.0-1.20.1");
        assert_eq!(
            merged.main_class.as_deref(),
            Some("net.fabricmc.loader.impl.launch.knot.KnotClient")
        );
        assert_eq!(merged.version_type.as_deref(), Some("release"));
        assert_eq!(merged.asset_index_id(), "5");
        assert!(merged.inherits_from.is_none());
        assert_eq!(merged.extra.get("complianceLevel"), Some(&json!(1)));
    }

    #[test]
    fn libraries_deduplicate_keeping_child_occurrence() {
        let merged = fabric_child().merge_onto(&vanilla());
        let names: Vec<_> = merged.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "com.mojang:brigadier:1.1.8",
                "org.ow2.asm:asm:9.3",
                "net.fabricmc:fabric-loader:0.15.0"
            ]
        );
        assert_eq!(
            merged.libraries[1].url.as_deref(),
            Some("https://maven.fabricmc.net/")
        );
    }

    #[test]
    fn arguments_concatenate_parent_then_child() {
        let merged = fabric_child().merge_onto(&vanilla());
        let args = merged.arguments.unwrap();
        assert_eq!(args.game, vec![json!("--username")]);
        assert_eq!(
            args.jvm,
            vec![
                json!("-Xss1M"),
                json!("-DFabricMcEmu=net.minecraft.client.main.Main")
            ]
        );
    }

    #[test]
    fn merge_with_self_is_identity() {
        let resolved = fabric_child().merge_onto(&vanilla());
        let again = resolved.clone().merge_onto(&resolved);
        assert_eq!(again, resolved);

        let plain = vanilla();
        assert_eq!(plain.clone().merge_onto(&plain), plain);
    }

    #[test]
    fn asset_index_id_falls_back_to_assets_then_id() {
        let mut info = VersionInfo {
            id: "b1.7.3".into(),
            ..Default::default()
        };
        assert_eq!(info.asset_index_id(), "b1.7.3");
        info.assets = Some("pre-1.6".into());
        assert_eq!(info.asset_index_id(), "pre-1.6");
    }

    #[test]
    fn parse_rejects_non_objects() {
        let err = VersionInfo::parse("[1,2]", "1.20.1").unwrap_err();
        assert!(matches!(err, CoreError::InvalidDescriptor { .. }));
    }

    #[test]
    fn library_rules_respect_os() {
        let lib: Library = serde_json::from_value(json!({
            "name": "ca.weblite:java-objc-bridge:1.1",
            "rules": [{"action": "allow", "os": {"name": "osx"}}]
        }))
        .unwrap();
        assert_eq!(lib.is_allowed_for_current_os(), cfg!(target_os = "macos"));
        assert!(Library::new("a:b:1").is_allowed_for_current_os());
    }

    #[tokio::test]
    async fn save_then_load_preserves_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let info = vanilla();
        let path = info.save_to(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("versions/1.20.1/1.20.1.json"));

        let loaded = VersionInfo::load_from(&path, "1.20.1").await.unwrap();
        assert_eq!(loaded, info);
    }
}
