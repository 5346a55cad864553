//! Shared fixtures for search integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use tidemark_db::MemoryBookmarkStore;
use tidemark_search::{
    Bookmark, BookmarkStore, BrowseCriteria, DomainCriteria, Error, OpenCountSource, Result,
    SearchResult, TagCriteria, Vector, VectorCriteria, VectorHit,
};

pub const USER: &str = "user-1";

/// Deterministic, ordered bookmark id.
pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn bm(n: u128, url: &str) -> Bookmark {
    Bookmark::new(id(n), USER, url)
}

pub fn v(x: f32, y: f32) -> Vector {
    Vector::from(vec![x, y])
}

/// In-memory store with switchable failures, latency and a call counter.
pub struct FlakyStore {
    inner: MemoryBookmarkStore,
    fail_tags: AtomicBool,
    fail_domains: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(bookmarks: Vec<Bookmark>) -> Self {
        Self {
            inner: MemoryBookmarkStore::with_bookmarks(bookmarks),
            fail_tags: AtomicBool::new(false),
            fail_domains: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_tags(&self, fail: bool) {
        self.fail_tags.store(fail, Ordering::SeqCst);
    }

    pub fn fail_domains(&self, fail: bool) {
        self.fail_domains.store(fail, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }
}

#[async_trait]
impl BookmarkStore for FlakyStore {
    async fn tag_candidates(&self, criteria: &TagCriteria) -> Result<Vec<SearchResult>> {
        self.enter().await;
        if self.fail_tags.load(Ordering::SeqCst) {
            return Err(Error::Search("tag query failed".to_string()));
        }
        self.inner.tag_candidates(criteria).await
    }

    async fn domain_candidates(&self, criteria: &DomainCriteria) -> Result<Vec<SearchResult>> {
        self.enter().await;
        if self.fail_domains.load(Ordering::SeqCst) {
            return Err(Error::Search("domain query failed".to_string()));
        }
        self.inner.domain_candidates(criteria).await
    }

    async fn vector_candidates(&self, criteria: &VectorCriteria) -> Result<Vec<VectorHit>> {
        self.enter().await;
        self.inner.vector_candidates(criteria).await
    }

    async fn browse(&self, criteria: &BrowseCriteria) -> Result<Vec<SearchResult>> {
        self.enter().await;
        self.inner.browse(criteria).await
    }
}

#[async_trait]
impl OpenCountSource for FlakyStore {
    async fn open_counts(&self, user_id: &str, ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        self.enter().await;
        self.inner.open_counts(user_id, ids).await
    }

    async fn record_open(&self, user_id: &str, bookmark_id: Uuid) -> Result<()> {
        self.enter().await;
        self.inner.record_open(user_id, bookmark_id).await
    }
}
