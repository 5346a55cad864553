//! Bookmark repository implementation.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, instrument};

use tidemark_core::{
    clean_metadata, BookmarkStore, BrowseCriteria, ContentType, Criteria, DomainCriteria, Error,
    Result, SearchResult, TagCriteria, VectorCriteria, VectorHit,
};

use crate::criteria_query::{CriteriaQueryBuilder, QueryParam};

/// PostgreSQL implementation of [`BookmarkStore`].
#[derive(Clone)]
pub struct PgBookmarkRepository {
    pool: Pool<Postgres>,
}

impl PgBookmarkRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Compile and run one criteria.
    async fn fetch(&self, criteria: &Criteria) -> Result<Vec<PgRow>> {
        let (sql, params) = CriteriaQueryBuilder::new(criteria).build();

        let mut q = sqlx::query(&sql);
        for param in &params {
            q = match param {
                QueryParam::Uuid(id) => q.bind(id),
                QueryParam::String(s) => q.bind(s),
                QueryParam::StringArray(arr) => q.bind(arr),
                QueryParam::Float(f) => q.bind(f),
                QueryParam::BigInt(n) => q.bind(n),
                QueryParam::Vector(v) => q.bind(v),
            };
        }

        q.fetch_all(&self.pool).await.map_err(Error::Database)
    }
}

/// Map a bookmark row to an unscored result with cleaned metadata.
fn row_to_result(row: &PgRow) -> Result<SearchResult> {
    let status: String = row.try_get("status")?;
    let content_type: Option<String> = row.try_get("content_type")?;
    let metadata: Option<JsonValue> = row.try_get("metadata")?;

    Ok(SearchResult {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        preview: row.try_get("preview")?,
        og_image_url: row.try_get("og_image_url")?,
        og_description: row.try_get("og_description")?,
        favicon_url: row.try_get("favicon_url")?,
        content_type: content_type
            .as_deref()
            .map(str::parse::<ContentType>)
            .transpose()?,
        status: status.parse()?,
        score: 0.0,
        match_type: None,
        matched_tags: None,
        open_count: None,
        starred: row.try_get("starred")?,
        read: row.try_get("read")?,
        created_at: row.try_get("created_at")?,
        metadata: clean_metadata(metadata.unwrap_or(JsonValue::Null)),
    })
}

#[async_trait]
impl BookmarkStore for PgBookmarkRepository {
    #[instrument(
        skip(self, criteria),
        fields(subsystem = "db", component = "bookmarks", op = "tag_candidates",
               user_id = %criteria.filter.user_id, tag_count = criteria.tags.len())
    )]
    async fn tag_candidates(&self, criteria: &TagCriteria) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let rows = self.fetch(&Criteria::Tag(criteria.clone())).await?;

        let results = rows
            .iter()
            .map(|row| -> Result<SearchResult> {
                let mut result = row_to_result(row)?;
                let mut matched: Vec<String> = row.try_get("matched_tags")?;
                matched.sort();
                result.matched_tags = Some(matched);
                Ok(result)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tag candidates fetched"
        );
        Ok(results)
    }

    #[instrument(
        skip(self, criteria),
        fields(subsystem = "db", component = "bookmarks", op = "domain_candidates",
               user_id = %criteria.filter.user_id, domain = %criteria.domain)
    )]
    async fn domain_candidates(&self, criteria: &DomainCriteria) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let rows = self.fetch(&Criteria::Domain(criteria.clone())).await?;
        let results = rows.iter().map(row_to_result).collect::<Result<Vec<_>>>()?;

        debug!(
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Domain candidates fetched"
        );
        Ok(results)
    }

    #[instrument(
        skip(self, criteria),
        fields(subsystem = "db", component = "bookmarks", op = "vector_candidates",
               user_id = %criteria.filter.user_id)
    )]
    async fn vector_candidates(&self, criteria: &VectorCriteria) -> Result<Vec<VectorHit>> {
        let start = Instant::now();
        let rows = self.fetch(&Criteria::Vector(criteria.clone())).await?;

        let hits = rows
            .iter()
            .map(|row| -> Result<VectorHit> {
                Ok(VectorHit {
                    result: row_to_result(row)?,
                    distance: row.try_get("distance")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Vector candidates fetched"
        );
        Ok(hits)
    }

    #[instrument(
        skip(self, criteria),
        fields(subsystem = "db", component = "bookmarks", op = "browse",
               user_id = %criteria.filter.user_id, limit = criteria.limit)
    )]
    async fn browse(&self, criteria: &BrowseCriteria) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let rows = self.fetch(&Criteria::Browse(criteria.clone())).await?;
        let results = rows.iter().map(row_to_result).collect::<Result<Vec<_>>>()?;

        debug!(
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Browse page fetched"
        );
        Ok(results)
    }
}
