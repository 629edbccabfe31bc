use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LOAD_PATH: &str = "/api/collection/initial";
pub const DEFAULT_SAVE_PATH: &str = "/api/collection/backup";
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String, // e.g., "http://10.0.1.2:3000"
    #[serde(default = "default_load_path")]
    pub load_path: String,
    #[serde(default = "default_save_path")]
    pub save_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_load_path() -> String {
    DEFAULT_LOAD_PATH.to_string()
}

fn default_save_path() -> String {
    DEFAULT_SAVE_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            load_path: default_load_path(),
            save_path: default_save_path(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load remote configuration from {data_dir}/remote.json, or build it
    /// from the environment when the file is absent or invalid.
    pub fn load_or_default(data_dir: &Path) -> Self {
        let remote_json = data_dir.join("remote.json");

        if remote_json.exists() {
            match std::fs::read_to_string(&remote_json) {
                Ok(content) => match serde_json::from_str::<RemoteConfig>(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded remote config: base_url={}", config.base_url);
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse remote.json: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to read remote.json: {}, using defaults", e);
                }
            }
        }

        let base_url = std::env::var("CARDSYNC_REMOTE_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("CARDSYNC_REMOTE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        tracing::info!("No remote.json found, using remote {}", base_url);

        RemoteConfig {
            timeout_secs,
            ..RemoteConfig::new(base_url)
        }
    }

    pub fn load_url(&self) -> String {
        join_url(&self.base_url, &self.load_path)
    }

    pub fn save_url(&self) -> String {
        join_url(&self.base_url, &self.save_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
