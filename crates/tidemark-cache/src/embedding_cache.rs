//! Query embedding cache.
//!
//! Embedding a query is the slowest step of a vector search and its output
//! only depends on the text and the model, so vectors are kept for a week.
//! Entries record the model that produced them and when; a lookup under a
//! different model, or past the TTL, is a miss and evicts the stale entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use tidemark_core::defaults::{EMBEDDING_CACHE_PREFIX, TTL_EMBEDDING_SECS};
use tidemark_core::{EmbeddingBackend, Error, Result, Vector};

use crate::stats::{CacheCounters, CacheStats};
use crate::store::CacheStore;

#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingEntry {
    vector: Vec<f32>,
    model: String,
    written_at: DateTime<Utc>,
}

impl EmbeddingEntry {
    /// Older than `ttl_secs` at `now`, whatever TTL the store applied.
    fn is_expired(&self, ttl_secs: u64, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.written_at).num_seconds();
        age > i64::try_from(ttl_secs).unwrap_or(i64::MAX)
    }
}

/// Cache of query embeddings over any [`CacheStore`].
#[derive(Clone)]
pub struct EmbeddingCache {
    inner: Arc<EmbeddingCacheInner>,
}

struct EmbeddingCacheInner {
    store: Arc<dyn CacheStore>,
    ttl_secs: u64,
    counters: CacheCounters,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(store, TTL_EMBEDDING_SECS)
    }

    pub fn with_ttl(store: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(EmbeddingCacheInner {
                store,
                ttl_secs,
                counters: CacheCounters::default(),
            }),
        }
    }

    /// Key for a text/model pair. Text is trimmed and lowercased first.
    pub fn cache_key(text: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.trim().to_lowercase().as_bytes());
        hasher.update([0u8]);
        hasher.update(model.as_bytes());
        format!("{}{}", EMBEDDING_CACHE_PREFIX, hex::encode(hasher.finalize()))
    }

    /// Cached embedding for `text` produced by `model`.
    pub async fn get(&self, text: &str, model: &str) -> Option<Vector> {
        let key = Self::cache_key(text, model);
        let counters = &self.inner.counters;

        let raw = match self.inner.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counters.miss();
                return None;
            }
            Err(e) => {
                counters.error();
                counters.miss();
                warn!(cache_key = %key, error = %e, "Embedding cache read failed, treating as miss");
                return None;
            }
        };

        let entry: EmbeddingEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                counters.error();
                counters.miss();
                warn!(cache_key = %key, error = %e, "Embedding cache entry unreadable");
                return None;
            }
        };

        if entry.model != model {
            counters.miss();
            debug!(
                cache_key = %key,
                cached_model = %entry.model,
                model,
                "Embedding cache model mismatch, evicting"
            );
            self.evict(&key).await;
            return None;
        }

        if entry.is_expired(self.inner.ttl_secs, Utc::now()) {
            counters.miss();
            debug!(
                cache_key = %key,
                written_at = %entry.written_at,
                "Embedding cache entry expired, evicting"
            );
            self.evict(&key).await;
            return None;
        }

        counters.hit();
        debug!(cache_key = %key, model, "Embedding cache HIT");
        Some(Vector::from(entry.vector))
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.inner.store.delete(key).await {
            warn!(cache_key = %key, error = %e, "Failed to evict stale embedding");
        }
    }

    /// Store an embedding. Returns whether the write succeeded.
    pub async fn set(&self, text: &str, vector: &Vector, model: &str) -> bool {
        let key = Self::cache_key(text, model);
        let entry = EmbeddingEntry {
            vector: vector.as_slice().to_vec(),
            model: model.to_string(),
            written_at: Utc::now(),
        };

        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                self.inner.counters.error();
                warn!(cache_key = %key, error = %e, "Embedding cache serialization failed");
                return false;
            }
        };

        match self
            .inner
            .store
            .set(&key, serialized, self.inner.ttl_secs)
            .await
        {
            Ok(()) => {
                self.inner.counters.write();
                true
            }
            Err(e) => {
                self.inner.counters.error();
                warn!(cache_key = %key, error = %e, "Embedding cache write failed");
                false
            }
        }
    }

    /// Cached embedding, or a fresh one from `backend` which is then cached.
    pub async fn get_or_compute(&self, text: &str, backend: &dyn EmbeddingBackend) -> Result<Vector> {
        let model = backend.model_name().to_string();
        if let Some(vector) = self.get(text, &model).await {
            return Ok(vector);
        }

        let mut vectors = backend.embed_texts(&[text.trim().to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Backend returned no embedding".to_string()))?;

        self.set(text, &vector, &model).await;
        Ok(vector)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryCacheStore;
    use chrono::Duration;
    use tidemark_inference::MockEmbeddingBackend;

    fn cache() -> EmbeddingCache {
        EmbeddingCache::new(Arc::new(MemoryCacheStore::new()))
    }

    #[test]
    fn test_cache_key_normalizes_text() {
        assert_eq!(
            EmbeddingCache::cache_key("  Rust Async ", "m"),
            EmbeddingCache::cache_key("rust async", "m")
        );
        assert_ne!(
            EmbeddingCache::cache_key("rust", "m1"),
            EmbeddingCache::cache_key("rust", "m2")
        );
        assert!(EmbeddingCache::cache_key("rust", "m").starts_with("tm:embed:"));
    }

    #[tokio::test]
    async fn test_get_or_compute_calls_backend_once() {
        let cache = cache();
        let backend = MockEmbeddingBackend::new().with_dimension(4);

        let first = cache.get_or_compute("rust", &backend).await.unwrap();
        let second = cache.get_or_compute(" RUST ", &backend).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_model_mismatch_is_a_miss_and_evicts() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = EmbeddingCache::new(store.clone());
        let key = EmbeddingCache::cache_key("rust", "model-b");

        // An entry stored under model-b's key but written by model-a.
        let stale = EmbeddingEntry {
            vector: vec![1.0, 0.0],
            model: "model-a".to_string(),
            written_at: Utc::now(),
        };
        store
            .set(&key, serde_json::to_string(&stale).unwrap(), 60)
            .await
            .unwrap();

        assert!(cache.get("rust", "model-b").await.is_none());
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_entry_expiry_uses_written_at() {
        let now = Utc::now();
        let entry = EmbeddingEntry {
            vector: vec![1.0],
            model: "m".to_string(),
            written_at: now - Duration::seconds(TTL_EMBEDDING_SECS as i64 + 1),
        };
        assert!(entry.is_expired(TTL_EMBEDDING_SECS, now));
        assert!(!entry.is_expired(TTL_EMBEDDING_SECS + 60, now));
    }

    #[tokio::test]
    async fn test_entry_older_than_ttl_is_a_miss_and_evicts() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = EmbeddingCache::new(store.clone());
        let key = EmbeddingCache::cache_key("rust", "m");

        // Still present in the store, but written eight days ago.
        let old = EmbeddingEntry {
            vector: vec![1.0, 0.0],
            model: "m".to_string(),
            written_at: Utc::now() - Duration::days(8),
        };
        store
            .set(&key, serde_json::to_string(&old).unwrap(), 60)
            .await
            .unwrap();

        assert!(cache.get("rust", "m").await.is_none());
        assert!(store.is_empty().await);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_fresh_entry_is_a_hit() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = EmbeddingCache::new(store.clone());

        assert!(cache.set("rust", &Vector::from(vec![1.0, 0.0]), "m").await);
        assert_eq!(
            cache.get("rust", "m").await,
            Some(Vector::from(vec![1.0, 0.0]))
        );
    }

    #[tokio::test]
    async fn test_backend_failure_propagates_and_caches_nothing() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = EmbeddingCache::new(store.clone());
        let backend = MockEmbeddingBackend::new();
        backend.set_failing(true);

        let err = cache.get_or_compute("rust", &backend).await;
        assert!(matches!(err, Err(Error::Embedding(_))));
        assert!(store.is_empty().await);
    }
}
