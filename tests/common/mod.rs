use cardsync::{ChannelSink, FileCache, Notification, RetryConfig, SyncConfig, SyncCoordinator};
use cardsync_remote::{HttpCollectionService, RemoteConfig};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Engine {
    pub coordinator: Arc<SyncCoordinator>,
    pub notifications: UnboundedReceiver<Notification>,
}

/// Retries fast enough for real-time tests against a mock server.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay_ms: 5,
        max_delay_ms: 20,
    }
}

/// Coordinator backed by a file cache in `data_dir` and the HTTP remote at
/// `base_url`.
pub fn engine(base_url: &str, data_dir: &TempDir) -> Engine {
    let config = SyncConfig {
        retry: fast_retry(),
        ..SyncConfig::default()
    }
    .with_data_dir(data_dir.path());

    let mut remote_config = RemoteConfig::new(base_url);
    remote_config.timeout_secs = 2;

    let (sink, notifications) = ChannelSink::new();
    let coordinator = SyncCoordinator::from_config(
        &config,
        Arc::new(FileCache::new(config.cache_dir())),
        Arc::new(HttpCollectionService::new(remote_config)),
        Arc::new(sink),
    );

    Engine {
        coordinator: Arc::new(coordinator),
        notifications,
    }
}
