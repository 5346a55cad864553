//! Criteria query builder.
//!
//! Compiles one [`Criteria`] value into a SQL statement with numbered bind
//! parameters. Each criteria variant is compiled on its own; user input only
//! ever reaches the database as a bound parameter.

use pgvector::Vector;
use uuid::Uuid;

use tidemark_core::defaults::{
    MISSING_EMBEDDING_DISTANCE, SUMMARY_DISTANCE_WEIGHT, TITLE_DISTANCE_WEIGHT,
};
use tidemark_core::{
    BookmarkStatus, BrowseCriteria, CommonFilter, ContentType, Criteria, DomainCriteria,
    SpecialFilter, TagCriteria, VectorCriteria, VectorThreshold,
};

use crate::escape_like;

/// Columns selected for every bookmark result row.
pub const BOOKMARK_COLUMNS: &str = "b.id, b.url, b.title, b.summary, b.preview, \
     b.og_image_url, b.og_description, b.favicon_url, b.content_type, b.status, \
     b.starred, b.read, b.created_at, b.metadata";

/// Canonical host of `b.url`: no scheme, credentials, port or trailing dot,
/// and no leading `www.`. Mirrors [`tidemark_core::extract_domain`].
const URL_HOST_EXPR: &str = r"regexp_replace(rtrim(substring(lower(b.url) from '^(?:[a-z][a-z0-9+.-]*://)?(?:[^/?#]*@)?([^/?#:]*)'), '.'), '^www\.', '')";

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// Single UUID parameter.
    Uuid(Uuid),
    /// String parameter.
    String(String),
    /// Array of strings (for `= ANY(...)`).
    StringArray(Vec<String>),
    /// Double-precision parameter.
    Float(f64),
    /// Row limit.
    BigInt(i64),
    /// Query embedding.
    Vector(Vector),
}

/// Generates SQL for a single retrieval criteria.
///
/// # Example
///
/// ```rust,ignore
/// use tidemark_core::{CommonFilter, Criteria, TagCriteria};
/// use tidemark_db::CriteriaQueryBuilder;
///
/// let criteria = Criteria::Tag(TagCriteria::new(
///     CommonFilter::new("user-1").require_ready(true),
///     vec!["rust".to_string()],
/// ));
/// let (sql, params) = CriteriaQueryBuilder::new(&criteria).build();
/// // params: [String("user-1"), StringArray(["rust"]), BigInt(500)]
/// ```
pub struct CriteriaQueryBuilder<'a> {
    criteria: &'a Criteria,
    params: Vec<QueryParam>,
}

impl<'a> CriteriaQueryBuilder<'a> {
    pub fn new(criteria: &'a Criteria) -> Self {
        Self {
            criteria,
            params: Vec::new(),
        }
    }

    /// Build the statement.
    ///
    /// Returns the SQL text and its parameters in placeholder order.
    pub fn build(mut self) -> (String, Vec<QueryParam>) {
        let criteria = self.criteria;
        let sql = match criteria {
            Criteria::Tag(c) => self.tag_sql(c),
            Criteria::Domain(c) => self.domain_sql(c),
            Criteria::Vector(c) => match c.threshold {
                VectorThreshold::Adaptive { matching_distance } => {
                    self.adaptive_vector_sql(c, matching_distance)
                }
                VectorThreshold::TopK { k } => self.top_k_vector_sql(c, k),
            },
            Criteria::Browse(c) => self.browse_sql(c),
        };
        (sql, self.params)
    }

    fn bind(&mut self, param: QueryParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    fn bind_limit(&mut self, limit: usize) -> String {
        self.bind(QueryParam::BigInt(
            i64::try_from(limit).unwrap_or(i64::MAX),
        ))
    }

    /// Ownership and status, without type or special filters.
    fn owner_status_clause(&mut self, filter: &CommonFilter) -> String {
        let user = self.bind(QueryParam::String(filter.user_id.clone()));
        let mut clauses = vec![format!("b.user_id = {}", user)];
        if filter.require_ready {
            clauses.push(format!("b.status = '{}'", BookmarkStatus::Ready.as_str()));
        }
        clauses.join(" AND ")
    }

    /// Content-type inclusion and OR-combined special filters.
    fn content_clause(&mut self, filter: &CommonFilter) -> String {
        let mut clauses = Vec::new();

        if !filter.types.is_empty() {
            let types = self.bind(QueryParam::StringArray(
                filter.types.iter().map(|t| t.as_str().to_string()).collect(),
            ));
            clauses.push(format!("b.content_type = ANY({}::text[])", types));
        }

        if !filter.special_filters.is_empty() {
            let readable = ContentType::readable()
                .iter()
                .map(|t| format!("'{}'", t.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            let alternatives: Vec<String> = filter
                .special_filters
                .iter()
                .map(|f| match f {
                    SpecialFilter::Read => {
                        format!("(b.content_type IN ({}) AND b.read)", readable)
                    }
                    SpecialFilter::Unread => {
                        format!("(b.content_type IN ({}) AND NOT b.read)", readable)
                    }
                    SpecialFilter::Star => "b.starred".to_string(),
                })
                .collect();
            clauses.push(format!("({})", alternatives.join(" OR ")));
        }

        if clauses.is_empty() {
            "TRUE".to_string()
        } else {
            clauses.join(" AND ")
        }
    }

    fn filter_clause(&mut self, filter: &CommonFilter) -> String {
        let owner = self.owner_status_clause(filter);
        let content = self.content_clause(filter);
        format!("{} AND {}", owner, content)
    }

    fn distance_expr(&mut self, embedding: &Vector) -> String {
        let query = self.bind(QueryParam::Vector(embedding.clone()));
        format!(
            "({tw} * COALESCE(b.title_embedding <=> {q}, {miss}) + \
             {sw} * COALESCE(b.summary_embedding <=> {q}, {miss}))",
            tw = TITLE_DISTANCE_WEIGHT,
            sw = SUMMARY_DISTANCE_WEIGHT,
            miss = sql_float(MISSING_EMBEDDING_DISTANCE),
            q = query,
        )
    }

    fn tag_sql(&mut self, c: &TagCriteria) -> String {
        let filter = self.filter_clause(&c.filter);
        let tags = self.bind(QueryParam::StringArray(
            c.tags.iter().map(|t| t.to_lowercase()).collect(),
        ));
        let limit = self.bind_limit(c.limit);
        format!(
            "SELECT {cols}, array_agg(DISTINCT lower(t.name)) AS matched_tags \
             FROM bookmark b \
             JOIN bookmark_tag bt ON bt.bookmark_id = b.id \
             JOIN tag t ON t.id = bt.tag_id \
             WHERE {filter} AND lower(t.name) = ANY({tags}::text[]) \
             GROUP BY b.id \
             ORDER BY count(DISTINCT lower(t.name)) DESC, b.id DESC \
             LIMIT {limit}",
            cols = BOOKMARK_COLUMNS,
        )
    }

    /// Exact host matches sort ahead of partial ones so the limit keeps them.
    fn domain_sql(&mut self, c: &DomainCriteria) -> String {
        let domain = c.domain.to_lowercase();
        let filter = self.filter_clause(&c.filter);
        let pattern = self.bind(QueryParam::String(format!("%{}%", escape_like(&domain))));
        let exact = self.bind(QueryParam::String(domain));
        let limit = self.bind_limit(c.limit);
        format!(
            "SELECT {cols} FROM bookmark b \
             WHERE {filter} AND lower(b.url) LIKE {pattern} \
             ORDER BY CASE WHEN {host} = {exact} THEN 0 ELSE 1 END, b.id DESC \
             LIMIT {limit}",
            cols = BOOKMARK_COLUMNS,
            host = URL_HOST_EXPR,
        )
    }

    /// The minimum distance is taken over every owned, status-eligible
    /// bookmark; type and special filters only narrow the candidates.
    fn adaptive_vector_sql(&mut self, c: &VectorCriteria, matching_distance: f64) -> String {
        let distance = self.distance_expr(&c.embedding);
        let owner = self.owner_status_clause(&c.filter);
        let content = self.content_clause(&c.filter);
        let margin = self.bind(QueryParam::Float(matching_distance));
        let limit = self.bind_limit(c.limit);
        format!(
            "WITH eligible AS ( \
                 SELECT b.id, {distance} AS distance FROM bookmark b WHERE {owner} \
             ), bound AS ( \
                 SELECT MIN(distance) AS min_distance FROM eligible \
             ) \
             SELECT {cols}, e.distance \
             FROM eligible e \
             JOIN bookmark b ON b.id = e.id \
             CROSS JOIN bound \
             WHERE {content} \
               AND e.distance <= bound.min_distance + {margin} \
               AND e.distance < {sanity} \
             ORDER BY e.distance ASC, b.id DESC \
             LIMIT {limit}",
            cols = BOOKMARK_COLUMNS,
            sanity = sql_float(MISSING_EMBEDDING_DISTANCE),
        )
    }

    fn top_k_vector_sql(&mut self, c: &VectorCriteria, k: usize) -> String {
        let distance = self.distance_expr(&c.embedding);
        let filter = self.filter_clause(&c.filter);
        let limit = self.bind_limit(k.min(c.limit));
        format!(
            "SELECT {cols}, {distance} AS distance \
             FROM bookmark b \
             WHERE {filter} \
             ORDER BY distance ASC, b.id DESC \
             LIMIT {limit}",
            cols = BOOKMARK_COLUMNS,
        )
    }

    fn browse_sql(&mut self, c: &BrowseCriteria) -> String {
        let mut filter = self.filter_clause(&c.filter);
        if let Some(before) = c.before {
            let cursor = self.bind(QueryParam::Uuid(before));
            filter.push_str(&format!(" AND b.id < {}", cursor));
        }
        let limit = self.bind_limit(c.limit);
        format!(
            "SELECT {cols} FROM bookmark b \
             WHERE {filter} \
             ORDER BY b.id DESC \
             LIMIT {limit}",
            cols = BOOKMARK_COLUMNS,
        )
    }
}

/// Render a float constant so PostgreSQL reads it as a numeric literal.
fn sql_float(value: f64) -> String {
    format!("{:.1}", value)
}
