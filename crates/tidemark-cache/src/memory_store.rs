//! In-process LRU cache store.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use tidemark_core::defaults::MEMORY_CACHE_CAPACITY;
use tidemark_core::Result;

use crate::store::CacheStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Bounded in-memory store; least recently used entries are evicted first.
///
/// Used when Redis is disabled or unreachable, and in tests.
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()))
            }
            Some(_) => {}
        }
        entries.pop(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.entries.lock().await.put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.pop(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let keys: Vec<String> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            entries.pop(key);
        }
        Ok(keys.len() as u64)
    }

    async fn ping(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryCacheStore::new();
        store.set("a", "1".to_string(), 60).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));

        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let store = MemoryCacheStore::new();
        store.set("a", "1".to_string(), 0).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let store = MemoryCacheStore::new();
        store.set("tm:search:alice:1", "x".to_string(), 60).await.unwrap();
        store.set("tm:search:alice:2", "x".to_string(), 60).await.unwrap();
        store.set("tm:search:bob:1", "x".to_string(), 60).await.unwrap();

        assert_eq!(store.delete_prefix("tm:search:alice:").await.unwrap(), 2);
        assert_eq!(store.len().await, 1);
        assert!(store.get("tm:search:bob:1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = MemoryCacheStore::with_capacity(2);
        store.set("a", "1".to_string(), 60).await.unwrap();
        store.set("b", "2".to_string(), 60).await.unwrap();
        store.get("a").await.unwrap();
        store.set("c", "3".to_string(), 60).await.unwrap();

        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
    }
}
