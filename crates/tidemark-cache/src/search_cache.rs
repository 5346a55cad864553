//! Search result cache.
//!
//! Caches whole result pages keyed by a hash of the normalized request.
//! Lifetimes depend on which strategies produced the page, and every read
//! re-checks the entry's own write time and TTL so expiry never depends on
//! the store. All store failures are logged and treated as a miss or no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use tidemark_core::defaults::{
    SEARCH_CACHE_PREFIX, TTL_COMBINED_SECS, TTL_DEFAULT_BROWSE_SECS, TTL_DOMAIN_SECS,
    TTL_EMPTY_SECS, TTL_TAG_SECS, TTL_VECTOR_SECS,
};
use tidemark_core::{ContentType, QueryType, SearchPage, SearchRequest, SpecialFilter};

use crate::stats::{CacheCounters, CacheStats};
use crate::store::CacheStore;

/// TTL in seconds for a page of the given query type and size.
pub fn ttl_for(query_type: QueryType, result_count: usize) -> u64 {
    if result_count == 0 {
        return TTL_EMPTY_SECS;
    }
    match query_type {
        QueryType::DefaultBrowse => TTL_DEFAULT_BROWSE_SECS,
        QueryType::Tag => TTL_TAG_SECS,
        QueryType::Domain => TTL_DOMAIN_SECS,
        QueryType::Vector => TTL_VECTOR_SECS,
        QueryType::Combined => TTL_COMBINED_SECS,
    }
}

/// What a cache hit hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSearch {
    pub page: SearchPage,
    /// Time the original computation took.
    pub query_time_ms: u64,
    pub query_type: QueryType,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    page: SearchPage,
    query_time_ms: u64,
    query_type: QueryType,
    written_at: DateTime<Utc>,
    ttl_secs: u64,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.written_at);
        age.num_milliseconds() < (self.ttl_secs as i64).saturating_mul(1000)
    }
}

/// Normalized request fields that identify a page.
#[derive(Serialize)]
struct KeyMaterial<'a> {
    query: String,
    types: Vec<ContentType>,
    tags: Vec<String>,
    special_filters: Vec<SpecialFilter>,
    matching_distance: f64,
    cursor: Option<&'a str>,
    limit: usize,
}

/// Search cache over any [`CacheStore`].
#[derive(Clone)]
pub struct SearchCache {
    inner: Arc<SearchCacheInner>,
}

struct SearchCacheInner {
    store: Arc<dyn CacheStore>,
    prefix: String,
    counters: CacheCounters,
}

impl SearchCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_prefix(store, SEARCH_CACHE_PREFIX)
    }

    pub fn with_prefix(store: Arc<dyn CacheStore>, prefix: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SearchCacheInner {
                store,
                prefix: prefix.into(),
                counters: CacheCounters::default(),
            }),
        }
    }

    /// Key prefix shared by every entry of one user.
    ///
    /// The user id is hashed so that no id can be a prefix of another's
    /// segment (`a` against `a:b`) and no glob metacharacter reaches the store.
    pub fn user_prefix(&self, user_id: &str) -> String {
        let digest = Sha256::digest(user_id.as_bytes());
        format!("{}{}:", self.inner.prefix, hex::encode(digest))
    }

    /// Deterministic key for a request.
    ///
    /// Filter arrays are sorted and deduplicated and the query is trimmed
    /// and lowercased, so requests that differ only in ordering or case
    /// share an entry.
    pub fn cache_key(&self, request: &SearchRequest) -> String {
        let mut tags = request.tag_names();
        tags.sort();

        let material = KeyMaterial {
            query: request.query_text().to_lowercase(),
            types: request.type_filter(),
            tags,
            special_filters: request.special_filter_set(),
            matching_distance: request.matching_distance_or_default(),
            cursor: request.cursor.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            limit: request.page_size(),
        };

        let mut hasher = Sha256::new();
        // Serializing a struct of plain values cannot fail.
        hasher.update(serde_json::to_vec(&material).unwrap_or_default());
        let hash = hex::encode(hasher.finalize());

        format!("{}{}", self.user_prefix(&request.user_id), hash)
    }

    /// Cached page for the request, if present and not expired.
    pub async fn get(&self, request: &SearchRequest) -> Option<CachedSearch> {
        let key = self.cache_key(request);
        let counters = &self.inner.counters;

        let raw = match self.inner.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counters.miss();
                debug!(cache_key = %key, "Search cache MISS");
                return None;
            }
            Err(e) => {
                counters.error();
                counters.miss();
                warn!(cache_key = %key, error = %e, "Search cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                counters.error();
                counters.miss();
                warn!(cache_key = %key, error = %e, "Search cache entry unreadable, treating as miss");
                return None;
            }
        };

        if !entry.is_live(Utc::now()) {
            counters.miss();
            debug!(cache_key = %key, ttl_secs = entry.ttl_secs, "Search cache entry expired");
            if let Err(e) = self.inner.store.delete(&key).await {
                warn!(cache_key = %key, error = %e, "Failed to delete expired search cache entry");
            }
            return None;
        }

        counters.hit();
        debug!(cache_key = %key, query_type = %entry.query_type, "Search cache HIT");
        Some(CachedSearch {
            page: entry.page,
            query_time_ms: entry.query_time_ms,
            query_type: entry.query_type,
        })
    }

    /// Store a page. Returns whether the write succeeded.
    pub async fn set(
        &self,
        request: &SearchRequest,
        page: &SearchPage,
        query_type: QueryType,
        query_time_ms: u64,
    ) -> bool {
        let key = self.cache_key(request);
        let ttl_secs = ttl_for(query_type, page.bookmarks.len());
        let entry = CacheEntry {
            page: page.clone(),
            query_time_ms,
            query_type,
            written_at: Utc::now(),
            ttl_secs,
        };

        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                self.inner.counters.error();
                warn!(cache_key = %key, error = %e, "Search cache serialization failed");
                return false;
            }
        };

        match self.inner.store.set(&key, serialized, ttl_secs).await {
            Ok(()) => {
                self.inner.counters.write();
                debug!(cache_key = %key, ttl_secs, query_type = %query_type, "Search cache SET");
                true
            }
            Err(e) => {
                self.inner.counters.error();
                warn!(cache_key = %key, error = %e, "Search cache write failed");
                false
            }
        }
    }

    /// Drop every cached page for a user. Returns the number of entries removed.
    pub async fn invalidate_user(&self, user_id: &str) -> u64 {
        let prefix = self.user_prefix(user_id);
        match self.inner.store.delete_prefix(&prefix).await {
            Ok(removed) => {
                info!(user_id, removed, "Search cache invalidated for user");
                removed
            }
            Err(e) => {
                self.inner.counters.error();
                warn!(user_id, error = %e, "Search cache invalidation failed");
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.store.backend_name()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.store.ping().await
    }
}
