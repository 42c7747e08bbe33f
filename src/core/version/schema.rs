// ─── Descriptor Schema Migration ───
// Older launchers wrote descriptor keys in PascalCase or snake_case. Loading
// normalizes them to the canonical camelCase schema before typed parsing.

use serde_json::{Map, Value};
use tracing::debug;

const TOP_LEVEL_KEYS: &[&str] = &[
    "id",
    "inheritsFrom",
    "mainClass",
    "libraries",
    "assetIndex",
    "assets",
    "downloads",
    "javaVersion",
    "arguments",
    "minecraftArguments",
    "type",
    "releaseTime",
    "time",
    "jar",
    "minimumLauncherVersion",
    "complianceLevel",
];
const ASSET_INDEX_KEYS: &[&str] = &["id", "url", "sha1", "size", "totalSize"];
const JAVA_VERSION_KEYS: &[&str] = &["component", "majorVersion"];
const ARGUMENTS_KEYS: &[&str] = &["game", "jvm"];
const LIBRARY_KEYS: &[&str] = &["name", "downloads", "url", "rules", "natives", "extract"];

/// Rewrite aliased keys of a descriptor to their canonical names.
///
/// Returns `true` when anything was renamed. When both an alias and the
/// canonical key are present the canonical value is kept.
pub fn migrate_descriptor(root: &mut Value) -> bool {
    let Some(obj) = root.as_object_mut() else {
        return false;
    };

    let mut migrated = canonicalize_keys(obj, TOP_LEVEL_KEYS);

    if let Some(Value::Object(asset_index)) = obj.get_mut("assetIndex") {
        migrated |= canonicalize_keys(asset_index, ASSET_INDEX_KEYS);
    }
    if let Some(Value::Object(java)) = obj.get_mut("javaVersion") {
        migrated |= canonicalize_keys(java, JAVA_VERSION_KEYS);
    }
    if let Some(Value::Object(arguments)) = obj.get_mut("arguments") {
        migrated |= canonicalize_keys(arguments, ARGUMENTS_KEYS);
    }
    if let Some(Value::Array(libraries)) = obj.get_mut("libraries") {
        for library in libraries.iter_mut() {
            if let Value::Object(library) = library {
                migrated |= canonicalize_keys(library, LIBRARY_KEYS);
            }
        }
    }

    if migrated {
        debug!("Migrated legacy descriptor keys to canonical schema");
    }
    migrated
}

fn canonicalize_keys(obj: &mut Map<String, Value>, canonical: &[&str]) -> bool {
    let renames: Vec<(String, &str)> = obj
        .keys()
        .filter(|key| !canonical.contains(&key.as_str()))
        .filter_map(|key| {
            let folded = fold(key);
            canonical
                .iter()
                .find(|candidate| fold(candidate) == folded)
                .map(|candidate| (key.clone(), *candidate))
        })
        .collect();

    let migrated = !renames.is_empty();
    for (alias, target) in renames {
        if let Some(value) = obj.remove(&alias) {
            if !obj.contains_key(target) {
                obj.insert(target.to_string(), value);
            }
        }
    }
    migrated
}

/// Case- and underscore-insensitive form of a key.
fn fold(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pascal_and_snake_keys_become_camel_case() {
        let mut raw = json!({
            "Id": "fabric-1.20.1",
            "InheritsFrom": "1.20.1",
            "main_class": "net.fabricmc.loader.impl.launch.knot.KnotClient",
            "AssetIndex": {"Id": "5", "Url": "https://x/5.json", "TotalSize": 10},
            "Libraries": [{"Name": "a:b:1"}]
        });

        assert!(migrate_descriptor(&mut raw));
        assert_eq!(raw["id"], "fabric-1.20.1");
        assert_eq!(raw["inheritsFrom"], "1.20.1");
        assert_eq!(raw["mainClass"], "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(raw["assetIndex"]["id"], "5");
        assert_eq!(raw["assetIndex"]["totalSize"], 10);
        assert_eq!(raw["libraries"][0]["name"], "a:b:1");
        assert!(raw.get("Id").is_none());
    }

    #[test]
    fn canonical_key_wins_over_alias() {
        let mut raw = json!({"mainClass": "canonical.Main", "MainClass": "legacy.Main"});
        migrate_descriptor(&mut raw);
        assert_eq!(raw["mainClass"], "canonical.Main");
        assert!(raw.get("MainClass").is_none());
    }

    #[test]
    fn canonical_descriptor_is_untouched() {
        let mut raw = json!({"id": "1.20.1", "mainClass": "m", "customField": 1});
        let before = raw.clone();
        assert!(!migrate_descriptor(&mut raw));
        assert_eq!(raw, before);
    }
}
