use async_trait::async_trait;
use dashmap::DashMap;

use super::LocalDurableCache;
use crate::error::Result;

/// Process-local cache. Survives nothing, but keeps the same contract as
/// [`super::FileCache`] for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-populated with one entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let cache = Self::new();
        cache.entries.insert(key.to_string(), value.to_string());
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LocalDurableCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
