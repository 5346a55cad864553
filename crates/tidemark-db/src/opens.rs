//! Bookmark open-event repository.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use tidemark_core::{Error, OpenCountSource, Result};

/// PostgreSQL implementation of [`OpenCountSource`].
#[derive(Clone)]
pub struct PgOpenEventRepository {
    pool: Pool<Postgres>,
}

impl PgOpenEventRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OpenCountSource for PgOpenEventRepository {
    #[instrument(
        skip(self, ids),
        fields(subsystem = "db", component = "opens", op = "open_counts",
               user_id = %user_id, id_count = ids.len())
    )]
    async fn open_counts(&self, user_id: &str, ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT bookmark_id, COUNT(*)::bigint AS open_count
             FROM bookmark_open
             WHERE user_id = $1 AND bookmark_id = ANY($2::uuid[])
             GROUP BY bookmark_id",
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let counts = rows
            .iter()
            .map(|row| -> Result<(Uuid, i64)> {
                Ok((row.try_get("bookmark_id")?, row.try_get("open_count")?))
            })
            .collect::<Result<HashMap<Uuid, i64>>>()?;

        debug!(result_count = counts.len(), "Open counts fetched");
        Ok(counts)
    }

    #[instrument(
        skip(self),
        fields(subsystem = "db", component = "opens", op = "record_open",
               user_id = %user_id, bookmark_id = %bookmark_id)
    )]
    async fn record_open(&self, user_id: &str, bookmark_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO bookmark_open (id, bookmark_id, user_id, opened_at)
             SELECT $1, b.id, b.user_id, NOW()
             FROM bookmark b
             WHERE b.id = $2 AND b.user_id = $3",
        )
        .bind(Uuid::now_v7())
        .bind(bookmark_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Bookmark {} not found", bookmark_id)));
        }

        debug!("Open event recorded");
        Ok(())
    }
}
