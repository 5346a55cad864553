//! # tidemark-db
//!
//! PostgreSQL database layer for tidemark bookmark search.
//!
//! This crate provides:
//! - Connection pool management
//! - Schema migrations and a startup embedding-dimension check
//! - A criteria query builder compiling each retrieval strategy on its own
//! - Bookmark and open-event repositories
//! - An in-memory store with the same semantics
//!
//! ## Example
//!
//! ```rust,ignore
//! use tidemark_db::{BookmarkStore, CommonFilter, Database, TagCriteria};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/tidemark").await?;
//!     db.migrate().await?;
//!
//!     let criteria = TagCriteria::new(
//!         CommonFilter::new("user-1").require_ready(true),
//!         vec!["rust".to_string()],
//!     );
//!     let hits = db.bookmarks.tag_candidates(&criteria).await?;
//!     println!("{} bookmarks tagged rust", hits.len());
//!     Ok(())
//! }
//! ```
pub mod bookmarks;
pub mod criteria_query;
pub mod memory;
pub mod opens;
pub mod pool;
pub mod schema;

// Always compiled so integration tests (in tests/) can use the fixtures.
pub mod test_fixtures;

// Re-export core types
pub use tidemark_core::*;

pub use bookmarks::PgBookmarkRepository;
pub use criteria_query::{CriteriaQueryBuilder, QueryParam};
pub use memory::MemoryBookmarkStore;
pub use opens::PgOpenEventRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig, PoolStats};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Bookmark reads for the retrieval strategies.
    pub bookmarks: PgBookmarkRepository,
    /// Open-event writes and counts.
    pub opens: PgOpenEventRepository,
}

impl Database {
    /// Create a Database from an existing pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            bookmarks: PgBookmarkRepository::new(pool.clone()),
            opens: PgOpenEventRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with a custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Fail when the embedding columns were migrated with a different
    /// dimension than the embedding backend produces.
    pub async fn verify_embedding_dimension(&self, configured: usize) -> Result<()> {
        schema::verify_embedding_dimension(&self.pool, configured).await
    }

    /// Round-trip a trivial query to confirm the database is reachable.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
