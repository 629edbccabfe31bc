//! # cardsync
//!
//! Offline-tolerant synchronization engine for card collection quantities.
//!
//! A [`CollectionStore`] holds the working copy in memory. Every mutation is
//! written to a [`LocalDurableCache`] right away and pushed to a
//! [`RemoteCollectionService`] in the background under a bounded
//! [`RetryPolicy`]. Loading prefers the remote and falls back to the cache,
//! so the application keeps working while the server is unreachable.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cardsync::{CollectionStore, FileCache, SyncConfig, SyncCoordinator, TracingSink};
//! # use cardsync::{Collection, RemoteCollectionService};
//! use std::sync::Arc;
//! # struct Remote;
//! # #[async_trait::async_trait]
//! # impl RemoteCollectionService for Remote {
//! #     async fn fetch(&self) -> cardsync::Result<Collection> { Ok(Collection::new()) }
//! #     async fn push(&self, _: &Collection) -> cardsync::Result<()> { Ok(()) }
//! # }
//!
//! # async fn run() -> cardsync::Result<()> {
//! let config = SyncConfig::from_env();
//! let coordinator = SyncCoordinator::from_config(
//!     &config,
//!     Arc::new(FileCache::new(config.cache_dir())),
//!     Arc::new(Remote),
//!     Arc::new(TracingSink),
//! );
//!
//! let store = CollectionStore::new(Arc::new(coordinator));
//! store.initialize().await;
//!
//! // Visible immediately; await the PendingSave to observe the remote outcome.
//! store.add_card("card-a", false).await.wait().await?;
//! assert_eq!(store.get_quantity("card-a", false).await, 1);
//! # Ok(())
//! # }
//! ```
//!
//! The HTTP implementation of [`RemoteCollectionService`] lives in the
//! companion `cardsync-remote` crate.

pub mod cache;
pub mod config;
pub mod error;
pub mod notify;
pub mod remote;
pub mod retry;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod types;

pub use cache::{FileCache, LocalDurableCache, MemoryCache, DEFAULT_COLLECTION_KEY};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use notify::{ChannelSink, Notification, NotificationLevel, NotificationSink, TracingSink};
pub use remote::RemoteCollectionService;
pub use retry::{RetryConfig, RetryPolicy};
pub use snapshot::CollectionExport;
pub use store::CollectionStore;
pub use sync::{LoadOutcome, LoadSource, PendingSave, SyncCoordinator, SyncStatus};
pub use types::{CardVariant, Collection, CollectionRecord, CollectionStats, ItemId};

pub use tokio_util::sync::CancellationToken;
