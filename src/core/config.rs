use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{CoreError, CoreResult};
use crate::core::source::SourceKind;

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MANIFEST_TTL_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
const GAME_DIR_NAME: &str = ".minecraft";

/// Engine configuration persisted as JSON. Every field has a default so a
/// partial file (or none at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root of the game directory (`versions/`, `assets/`, `libraries/`).
    pub game_dir: PathBuf,
    pub download_source: SourceKind,
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub manifest_ttl_secs: u64,
    pub connect_timeout_secs: u64,
    /// Hosts that reject requests without a product user agent.
    pub product_user_agent_hosts: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            game_dir: default_game_dir(),
            download_source: SourceKind::Official,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            manifest_ttl_secs: DEFAULT_MANIFEST_TTL_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            product_user_agent_hosts: vec!["bmclapi2.bangbang93.com".to_string()],
        }
    }
}

impl EngineConfig {
    /// Load the config at `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<EngineConfig>(&raw) {
                Ok(cfg) => cfg.normalized(),
                Err(e) => {
                    warn!("Corrupt engine config at {:?}: {} (using defaults)", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                debug!("No engine config at {:?} ({}), using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON through a staging file.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let staged = path.with_extension("json.tmp");
        std::fs::write(&staged, json).map_err(|e| CoreError::io(&staged, e))?;
        std::fs::rename(&staged, path).map_err(|e| CoreError::io(path, e))?;
        Ok(())
    }

    /// Replace out-of-range values with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.max_concurrency == 0 {
            self.max_concurrency = DEFAULT_MAX_CONCURRENCY;
        }
        if self.manifest_ttl_secs == 0 {
            self.manifest_ttl_secs = DEFAULT_MANIFEST_TTL_SECS;
        }
        self
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn manifest_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.manifest_ttl_secs as i64)
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.game_dir.join("versions")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.game_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.game_dir.join("assets")
    }
}

fn default_game_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(GAME_DIR_NAME)
}
