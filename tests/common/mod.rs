#![allow(dead_code)]

use std::path::Path;

use mcfetch::core::source::DownloadSource;
use mcfetch::EngineConfig;
use serde_json::{json, Value};
use sha1::{Digest, Sha1};

pub const MANIFEST_PATH: &str = "/mc/game/version_manifest_v2.json";

pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Fast-failing config rooted at `game_dir`.
pub fn test_config(game_dir: &Path) -> EngineConfig {
    EngineConfig {
        game_dir: game_dir.to_path_buf(),
        max_retries: 0,
        retry_base_delay_ms: 1,
        connect_timeout_secs: 5,
        product_user_agent_hosts: Vec::new(),
        ..Default::default()
    }
}

/// Every endpoint pointed at the mock server.
pub fn test_source(uri: &str) -> DownloadSource {
    DownloadSource::official()
        .with_manifest_url(format!("{uri}{MANIFEST_PATH}"))
        .with_assets_base(format!("{uri}/assets"))
        .with_fabric_endpoints(format!("{uri}/fabric-meta/v2"), format!("{uri}/maven"))
        .with_quilt_endpoints(format!("{uri}/quilt-meta/v3"), format!("{uri}/maven"))
        .with_mirror_base(uri.to_string())
}

/// Manifest listing `(id, descriptor url, descriptor sha1)` entries.
pub fn manifest_json(entries: &[(&str, String, Option<String>)]) -> Value {
    let versions: Vec<Value> = entries
        .iter()
        .map(|(id, url, sha1)| {
            let mut entry = json!({
                "id": id,
                "type": "release",
                "url": url,
                "releaseTime": "2023-06-12T13:25:51+00:00"
            });
            if let Some(sha1) = sha1 {
                entry["sha1"] = json!(sha1);
            }
            entry
        })
        .collect();
    json!({
        "latest": {"release": entries.first().map(|e| e.0).unwrap_or(""), "snapshot": ""},
        "versions": versions
    })
}

pub async fn write_descriptor(game_dir: &Path, id: &str, body: &Value) {
    let dir = game_dir.join("versions").join(id);
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join(format!("{id}.json")), body.to_string())
        .await
        .unwrap();
}
