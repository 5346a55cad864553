//! # tidemark-cache
//!
//! Result and embedding caches for tidemark.
//!
//! Both caches sit on a [`CacheStore`]: Redis when configured, otherwise a
//! bounded in-process LRU. Cache failures never fail a search; they are
//! logged and treated as misses.

pub mod embedding_cache;
pub mod memory_store;
pub mod redis_store;
pub mod search_cache;
pub mod stats;
pub mod store;

use std::sync::Arc;

use tracing::{info, warn};

use tidemark_core::defaults::REDIS_URL;

pub use embedding_cache::EmbeddingCache;
pub use memory_store::MemoryCacheStore;
pub use redis_store::RedisCacheStore;
pub use search_cache::{ttl_for, CachedSearch, SearchCache};
pub use stats::CacheStats;
pub use store::CacheStore;

/// Build the cache store from the environment.
///
/// `REDIS_ENABLED=false` selects the in-process store. Otherwise `REDIS_URL`
/// (default `redis://localhost:6379`) is tried, falling back to the
/// in-process store if Redis cannot be reached.
pub async fn store_from_env() -> Arc<dyn CacheStore> {
    let enabled = std::env::var("REDIS_ENABLED")
        .map(|v| !v.eq_ignore_ascii_case("false") && v != "0")
        .unwrap_or(true);

    if !enabled {
        info!(subsystem = "cache", cache_backend = "memory", "Redis disabled, using in-process cache");
        return Arc::new(MemoryCacheStore::new());
    }

    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| REDIS_URL.to_string());
    match RedisCacheStore::connect(&url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                subsystem = "cache",
                error = %e,
                "Redis unavailable, falling back to in-process cache"
            );
            Arc::new(MemoryCacheStore::new())
        }
    }
}
