//! Key-value store abstraction behind the caches.

use async_trait::async_trait;

use tidemark_core::Result;

/// A string key-value store with per-entry TTL.
///
/// Stores report failures as errors; deciding to fail open is the caller's
/// job. Callers must not rely on the store enforcing TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value; `Ok(None)` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value with a time-to-live in seconds.
    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<()>;

    /// Remove one key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`, returning how many went.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;

    /// Whether the backend currently answers.
    async fn ping(&self) -> bool;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}
