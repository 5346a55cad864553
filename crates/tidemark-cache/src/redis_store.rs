//! Redis cache store.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use tidemark_core::{Error, Result};

use crate::store::CacheStore;

/// Cache store backed by a Redis connection manager.
///
/// The manager reconnects on its own after transient failures, so a
/// cloned handle stays usable for the life of the process.
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
}

impl RedisCacheStore {
    /// Connect to `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Config(format!("Invalid Redis URL: {}", e)))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Cache(format!("Failed to connect to Redis: {}", e)))?;

        info!(
            subsystem = "cache",
            component = "redis",
            url = %mask_url(redis_url),
            "Redis cache store connected"
        );
        Ok(Self { connection })
    }
}

/// Hide credentials and host details in log output.
fn mask_url(url: &str) -> String {
    url.replace(|c: char| c.is_ascii_alphanumeric(), "*")
}

/// Keys requested per `SCAN` step.
const SCAN_BATCH: usize = 500;

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn escape_glob(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One `SCAN` step from `cursor` over keys matching `pattern`.
fn scan_cmd(cursor: u64, pattern: &str) -> redis::Cmd {
    let mut cmd = redis::cmd("SCAN");
    cmd.arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(SCAN_BATCH);
    cmd
}

fn cache_err(op: &str, e: redis::RedisError) -> Error {
    Error::Cache(format!("Redis {} error: {}", op, e))
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| cache_err("GET", e))
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs.max(1))
            .await
            .map_err(|e| cache_err("SET", e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| cache_err("DEL", e))
    }

    /// Walks the keyspace with `SCAN`, deleting each batch as it arrives.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", escape_glob(prefix));

        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = scan_cmd(cursor, &pattern)
                .query_async(&mut conn)
                .await
                .map_err(|e| cache_err("SCAN", e))?;

            if !keys.is_empty() {
                let deleted: u64 = conn
                    .del(&keys[..])
                    .await
                    .map_err(|e| cache_err("DEL", e))?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = %pattern, removed, "Prefix delete complete");
        Ok(removed)
    }

    async fn ping(&self) -> bool {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
