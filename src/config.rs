use std::path::PathBuf;

use crate::cache::DEFAULT_COLLECTION_KEY;
use crate::retry::RetryConfig;

/// Engine configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base directory for everything the engine keeps on disk.
    pub data_dir: PathBuf,
    /// Key of the collection blob in the local cache.
    pub cache_key: String,
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            cache_key: DEFAULT_COLLECTION_KEY.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load config from environment variables; unset or unparsable values
    /// keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let retry = RetryConfig {
            max_retries: env_parse("CARDSYNC_MAX_RETRIES").unwrap_or(defaults.retry.max_retries),
            base_delay_ms: env_parse("CARDSYNC_RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry.base_delay_ms),
            max_delay_ms: env_parse("CARDSYNC_RETRY_MAX_DELAY_MS")
                .unwrap_or(defaults.retry.max_delay_ms),
        };

        Self {
            data_dir: std::env::var("CARDSYNC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cache_key: std::env::var("CARDSYNC_CACHE_KEY")
                .ok()
                .filter(|key| !key.is_empty())
                .unwrap_or(defaults.cache_key),
            retry,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Directory holding the local durable cache.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
