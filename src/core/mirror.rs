// ─── Mirror Response Translators ───
// Mirrors list Forge and NeoForge builds in their own shapes. These pure
// functions normalise them to a newest-first list of version strings.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::core::error::CoreResult;

#[derive(Debug, Deserialize)]
struct ForgeBuild {
    version: String,
    #[serde(default)]
    mcversion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MavenMetadata {
    #[serde(default)]
    versioning: Option<MavenVersioning>,
}

#[derive(Debug, Deserialize)]
struct MavenVersioning {
    #[serde(default)]
    versions: Option<MavenVersions>,
}

#[derive(Debug, Deserialize)]
struct MavenVersions {
    #[serde(default, rename = "version")]
    items: Vec<String>,
}

/// Forge builds for `minecraft_version` from a mirror's JSON build list.
pub fn forge_versions_from_mirror_json(raw: &str, minecraft_version: &str) -> CoreResult<Vec<String>> {
    let builds: Vec<ForgeBuild> = serde_json::from_str(raw)?;
    let versions = builds
        .into_iter()
        .filter(|b| {
            b.mcversion
                .as_deref()
                .map_or(true, |mc| mc == minecraft_version)
        })
        .map(|b| b.version);
    Ok(newest_first(versions))
}

/// NeoForge builds for `minecraft_version` from `maven-metadata.xml`.
///
/// Modern builds are numbered `<minor>.<patch>.<build>` after the Minecraft
/// version (1.20.4 → `20.4.x`); the 1.20.1 line used `1.20.1-<build>`.
pub fn neoforge_versions_from_maven_metadata(
    xml: &str,
    minecraft_version: &str,
) -> CoreResult<Vec<String>> {
    let metadata: MavenMetadata = quick_xml::de::from_str(xml)?;
    let all = metadata
        .versioning
        .and_then(|v| v.versions)
        .map(|v| v.items)
        .unwrap_or_default();

    let legacy_prefix = format!("{minecraft_version}-");
    let modern_prefix = neoforge_prefix(minecraft_version);
    let versions = all.into_iter().filter(|v| {
        v.starts_with(&legacy_prefix)
            || modern_prefix
                .as_deref()
                .is_some_and(|prefix| v.starts_with(prefix))
    });
    Ok(newest_first(versions))
}

fn neoforge_prefix(minecraft_version: &str) -> Option<String> {
    let mut parts = minecraft_version.strip_prefix("1.")?.split('.');
    let minor = parts.next().filter(|p| !p.is_empty())?;
    let patch = parts.next().unwrap_or("0");
    Some(format!("{minor}.{patch}."))
}

fn newest_first(versions: impl Iterator<Item = String>) -> Vec<String> {
    let mut list: Vec<String> = versions.collect();
    list.sort_by(|a, b| compare_versions(b, a));
    list.dedup();
    list
}

/// Order dotted versions numerically where both sides are numbers.
///
/// A textual qualifier (`-beta`, `-rc1`) sorts before the bare release.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split(['.', '-', '+']).collect();
    let right: Vec<&str> = b.split(['.', '-', '+']).collect();

    for (l, r) in left.iter().zip(&right) {
        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    let qualifier = |rest: &[&str]| rest.first().is_some_and(|p| p.parse::<u64>().is_err());
    match left.len().cmp(&right.len()) {
        Ordering::Equal => Ordering::Equal,
        Ordering::Greater if qualifier(&left[right.len()..]) => Ordering::Less,
        Ordering::Greater => Ordering::Greater,
        Ordering::Less if qualifier(&right[left.len()..]) => Ordering::Greater,
        Ordering::Less => Ordering::Less,
    }
}
