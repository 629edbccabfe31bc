//! Durable local storage for the serialized collection.
//!
//! Every write replaces the whole value stored under a key; there are no
//! partial updates and no locking beyond what a single `set` provides.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Key under which the collection blob is stored.
pub const DEFAULT_COLLECTION_KEY: &str = "card-collection";

#[async_trait]
pub trait LocalDurableCache: Send + Sync {
    /// Read the value stored under `key`, `None` when nothing was stored.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}
