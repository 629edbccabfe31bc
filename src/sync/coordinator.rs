use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::cache::{LocalDurableCache, DEFAULT_COLLECTION_KEY};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::notify::{Notification, NotificationSink};
use crate::remote::RemoteCollectionService;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::types::Collection;

/// Where a loaded collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    Remote,
    LocalCache,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub collection: Collection,
    pub source: LoadSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub last_load_source: Option<LoadSource>,
    /// Last time the remote confirmed it holds our collection.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub local_write_failures: u64,
}

/// Reconciles the working collection with the remote authority and the
/// local durable cache.
///
/// Loading is remote-first with a local fallback and never fails. Saving
/// writes the local cache first, then pushes to the remote under
/// [`RetryPolicy`]; the local copy stands even when the push gives up.
pub struct SyncCoordinator {
    cache: Arc<dyn LocalDurableCache>,
    remote: Arc<dyn RemoteCollectionService>,
    notifier: Arc<dyn NotificationSink>,
    retry: RetryPolicy,
    cache_key: String,
    status: RwLock<SyncStatus>,
}

impl SyncCoordinator {
    pub fn new(
        cache: Arc<dyn LocalDurableCache>,
        remote: Arc<dyn RemoteCollectionService>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            cache,
            remote,
            notifier,
            retry: RetryPolicy::default(),
            cache_key: DEFAULT_COLLECTION_KEY.to_string(),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    pub fn from_config(
        config: &SyncConfig,
        cache: Arc<dyn LocalDurableCache>,
        remote: Arc<dyn RemoteCollectionService>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::new(cache, remote, notifier)
            .with_retry(config.retry)
            .with_cache_key(&config.cache_key)
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = RetryPolicy::new(config);
        self
    }

    pub fn with_cache_key(mut self, key: &str) -> Self {
        self.cache_key = key.to_string();
        self
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Load the collection: remote first, local cache second, empty last.
    pub async fn load(&self) -> Collection {
        self.load_detailed().await.collection
    }

    pub async fn load_detailed(&self) -> LoadOutcome {
        self.load_inner(None).await
    }

    /// Like [`SyncCoordinator::load_detailed`]; a cancelled fetch counts as a
    /// failed one and falls back to the cache.
    pub async fn load_with_cancel(&self, cancel: &CancellationToken) -> LoadOutcome {
        self.load_inner(Some(cancel)).await
    }

    async fn load_inner(&self, cancel: Option<&CancellationToken>) -> LoadOutcome {
        // Single attempt: a cold network should fall back quickly.
        let fetched = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(SyncError::Cancelled),
                result = self.remote.fetch() => result,
            },
            None => self.remote.fetch().await,
        };

        let outcome = match fetched {
            Ok(collection) => {
                tracing::info!(
                    "[SYNC] loaded {} records from {}",
                    collection.len(),
                    self.remote.describe()
                );
                self.write_local(&collection).await;
                let mut status = self.status.write().await;
                status.last_synced_at = Some(Utc::now());
                status.last_error = None;
                LoadOutcome {
                    collection,
                    source: LoadSource::Remote,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "[SYNC] load from {} failed: {}, falling back to local cache",
                    self.remote.describe(),
                    e
                );
                let outcome = match self.read_local().await {
                    Some(collection) => LoadOutcome {
                        collection,
                        source: LoadSource::LocalCache,
                    },
                    None => LoadOutcome {
                        collection: Collection::new(),
                        source: LoadSource::Empty,
                    },
                };
                self.notifier.notify(Notification::warning(format!(
                    "Server unavailable ({}), using the locally saved collection",
                    e
                )));
                self.status.write().await.last_error = Some(e.to_string());
                outcome
            }
        };

        self.status.write().await.last_load_source = Some(outcome.source);
        outcome
    }

    /// Last value written to the local cache, `None` if absent or unreadable.
    pub async fn read_local(&self) -> Option<Collection> {
        match self.cache.get(&self.cache_key).await {
            Ok(Some(payload)) => match Collection::from_json(&payload) {
                Ok(collection) => {
                    tracing::info!(
                        "[CACHE] loaded {} records from local cache",
                        collection.len()
                    );
                    Some(collection)
                }
                Err(e) => {
                    tracing::warn!("[CACHE] ignoring corrupted cache entry: {}", e);
                    None
                }
            },
            Ok(None) => {
                tracing::info!("[CACHE] no cached collection under {}", self.cache_key);
                None
            }
            Err(e) => {
                tracing::error!("[CACHE] failed to read local cache: {}", e);
                None
            }
        }
    }

    /// Best-effort overwrite of the local cache. Failures are logged and
    /// counted, never returned.
    pub async fn write_local(&self, collection: &Collection) -> bool {
        let written = match collection.to_json() {
            Ok(payload) => self.cache.set(&self.cache_key, &payload).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("[CACHE] failed to write local cache: {}", e);
                self.status.write().await.local_write_failures += 1;
                false
            }
        }
    }

    /// Push `collection` to the remote under the retry policy. On final
    /// failure an error notification is emitted and the last attempt's error
    /// returned.
    pub async fn push_remote(
        &self,
        collection: &Collection,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        let result = match cancel {
            Some(token) => {
                self.retry
                    .run_with_cancel(|| self.remote.push(collection), token)
                    .await
            }
            None => self.retry.run(|| self.remote.push(collection)).await,
        };

        let mut status = self.status.write().await;
        match &result {
            Ok(()) => {
                tracing::debug!(
                    "[SYNC] pushed {} records to {}",
                    collection.len(),
                    self.remote.describe()
                );
                status.last_synced_at = Some(Utc::now());
                status.last_error = None;
            }
            Err(SyncError::Cancelled) => {
                tracing::info!("[SYNC] push to {} cancelled", self.remote.describe());
                status.last_error = Some(SyncError::Cancelled.to_string());
            }
            Err(e) => {
                tracing::error!(
                    "[SYNC] push to {} failed after {} attempts: {}",
                    self.remote.describe(),
                    self.retry.config().attempts(),
                    e
                );
                self.notifier.notify(Notification::error(format!(
                    "Failed to save the collection to the server: {}",
                    e
                )));
                status.last_error = Some(e.to_string());
            }
        }
        result
    }

    /// Write the local cache, then push to the remote.
    pub async fn save(&self, collection: &Collection) -> Result<()> {
        self.write_local(collection).await;
        self.push_remote(collection, None).await
    }

    pub async fn save_with_cancel(
        &self,
        collection: &Collection,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.write_local(collection).await;
        self.push_remote(collection, Some(cancel)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::notify::{ChannelSink, NotificationLevel};
    use crate::types::{CardVariant, CollectionRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Remote double: serves `stored` on fetch unless `fetch_error` is set,
    /// fails every push while `push_error` is set.
    #[derive(Default)]
    struct ScriptedRemote {
        stored: Mutex<Collection>,
        fetch_error: Option<SyncError>,
        push_error: Option<SyncError>,
        pushes: AtomicUsize,
    }

    #[async_trait]
    impl RemoteCollectionService for ScriptedRemote {
        async fn fetch(&self) -> Result<Collection> {
            match &self.fetch_error {
                Some(e) => Err(e.clone()),
                None => Ok(self.stored.lock().unwrap().clone()),
            }
        }

        async fn push(&self, collection: &Collection) -> Result<()> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            match &self.push_error {
                Some(e) => Err(e.clone()),
                None => {
                    *self.stored.lock().unwrap() = collection.clone();
                    Ok(())
                }
            }
        }
    }

    fn sample() -> Collection {
        [("x-1".to_string(), CollectionRecord::new(2, 0))]
            .into_iter()
            .collect()
    }

    fn coordinator(
        remote: ScriptedRemote,
        cache: Arc<MemoryCache>,
    ) -> (
        SyncCoordinator,
        Arc<ScriptedRemote>,
        tokio::sync::mpsc::UnboundedReceiver<Notification>,
    ) {
        let remote = Arc::new(remote);
        let (sink, rx) = ChannelSink::new();
        let coordinator = SyncCoordinator::new(cache, remote.clone(), Arc::new(sink));
        (coordinator, remote, rx)
    }

    #[tokio::test]
    async fn test_load_from_remote_refreshes_cache() {
        let cache = Arc::new(MemoryCache::new());
        let remote = ScriptedRemote {
            stored: Mutex::new(sample()),
            ..Default::default()
        };
        let (coordinator, _, mut rx) = coordinator(remote, cache.clone());

        let outcome = coordinator.load_detailed().await;
        assert_eq!(outcome.source, LoadSource::Remote);
        assert_eq!(outcome.collection, sample());

        let cached = cache.get(DEFAULT_COLLECTION_KEY).await.unwrap().unwrap();
        assert_eq!(Collection::from_json(&cached).unwrap(), sample());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_load_is_idempotent_under_stable_remote() {
        let remote = ScriptedRemote {
            stored: Mutex::new(sample()),
            ..Default::default()
        };
        let (coordinator, _, _rx) = coordinator(remote, Arc::new(MemoryCache::new()));

        assert_eq!(coordinator.load().await, coordinator.load().await);
    }

    #[tokio::test]
    async fn test_load_falls_back_to_cache() {
        let cache = Arc::new(MemoryCache::with_entry(
            DEFAULT_COLLECTION_KEY,
            r#"{"x-1": {"normalCount": 2, "foilCount": 0}}"#,
        ));
        let remote = ScriptedRemote {
            fetch_error: Some(SyncError::Transport("connection refused".into())),
            ..Default::default()
        };
        let (coordinator, _, mut rx) = coordinator(remote, cache);

        let outcome = coordinator.load_detailed().await;
        assert_eq!(outcome.source, LoadSource::LocalCache);
        assert_eq!(outcome.collection, sample());

        let signal = rx.try_recv().unwrap();
        assert_eq!(signal.level, NotificationLevel::Warning);
    }

    #[tokio::test]
    async fn test_load_with_corrupted_cache_is_empty() {
        let cache = Arc::new(MemoryCache::with_entry(DEFAULT_COLLECTION_KEY, "{broken"));
        let remote = ScriptedRemote {
            fetch_error: Some(SyncError::MalformedPayload("eof".into())),
            ..Default::default()
        };
        let (coordinator, _, _rx) = coordinator(remote, cache);

        let outcome = coordinator.load_detailed().await;
        assert_eq!(outcome.source, LoadSource::Empty);
        assert!(outcome.collection.is_empty());
        assert_eq!(
            coordinator.status().await.last_load_source,
            Some(LoadSource::Empty)
        );
    }

    #[tokio::test]
    async fn test_load_cancelled_falls_back() {
        let cache = Arc::new(MemoryCache::with_entry(
            DEFAULT_COLLECTION_KEY,
            r#"{"x-1": {"normal": 2, "foil": 0}}"#,
        ));
        let remote = ScriptedRemote {
            stored: Mutex::new(Collection::new()),
            ..Default::default()
        };
        let (coordinator, _, _rx) = coordinator(remote, cache);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = coordinator.load_with_cancel(&cancel).await;
        assert_eq!(outcome.source, LoadSource::LocalCache);
        assert_eq!(outcome.collection, sample());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_writes_local_even_when_push_fails() {
        let cache = Arc::new(MemoryCache::new());
        let remote = ScriptedRemote {
            push_error: Some(SyncError::Status {
                status: 500,
                message: "boom".into(),
            }),
            ..Default::default()
        };
        let (coordinator, remote, mut rx) = coordinator(remote, cache.clone());

        let mut collection = sample();
        collection.increment("card-b", CardVariant::Foil);

        let err = coordinator.save(&collection).await.unwrap_err();
        assert!(matches!(err, SyncError::Status { status: 500, .. }));
        assert_eq!(remote.pushes.load(Ordering::SeqCst), 3);

        let cached = cache.get(DEFAULT_COLLECTION_KEY).await.unwrap().unwrap();
        assert_eq!(Collection::from_json(&cached).unwrap(), collection);

        let signal = rx.try_recv().unwrap();
        assert_eq!(signal.level, NotificationLevel::Error);
        assert!(coordinator.status().await.last_error.is_some());
    }

    #[tokio::test]
    async fn test_save_success_updates_remote_and_status() {
        let cache = Arc::new(MemoryCache::new());
        let (coordinator, remote, mut rx) = coordinator(ScriptedRemote::default(), cache);

        coordinator.save(&sample()).await.unwrap();
        assert_eq!(*remote.stored.lock().unwrap(), sample());
        assert_eq!(remote.pushes.load(Ordering::SeqCst), 1);

        let status = coordinator.status().await;
        assert!(status.last_synced_at.is_some());
        assert!(status.last_error.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_saves_keep_cache_readable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::new(crate::cache::FileCache::new(temp_dir.path())),
            Arc::new(ScriptedRemote::default()),
            Arc::new(crate::notify::TracingSink),
        ));

        for round in 0..10u32 {
            let handles: Vec<_> = (0..12u32)
                .map(|i| {
                    let coordinator = Arc::clone(&coordinator);
                    tokio::spawn(async move {
                        let collection: Collection = (0..=i + round)
                            .map(|n| (format!("card-{n}"), CollectionRecord::new(n + 1, i)))
                            .collect();
                        coordinator.save(&collection).await
                    })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap().unwrap();
            }

            assert!(
                coordinator.read_local().await.is_some(),
                "round {round}: cache unreadable"
            );
        }

        assert_eq!(coordinator.status().await.local_write_failures, 0);
    }
}
