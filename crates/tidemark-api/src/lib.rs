//! # tidemark-api
//!
//! HTTP surface for tidemark bookmark search.
//!
//! Routes:
//! - `POST /api/v1/search` with a JSON [`SearchRequest`] body
//! - `GET /api/v1/search` with the same fields as query parameters
//!   (`tags`, `types` and `specialFilters` as comma-separated lists)
//! - `POST /api/v1/users/:user_id/cache/invalidate`
//! - `POST /api/v1/users/:user_id/bookmarks/:bookmark_id/open`
//! - `GET /health`

pub mod config;
pub mod error;

use std::time::Duration;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tidemark_core::{ContentType, SearchRequest, SearchResponse, SpecialFilter};
use tidemark_db::Database;
use tidemark_search::BookmarkSearchEngine;

pub use config::ServerConfig;
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: BookmarkSearchEngine,
    /// Absent when the engine runs over a non-Postgres store.
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(engine: BookmarkSearchEngine) -> Self {
        Self {
            engine,
            database: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}

/// Time-ordered request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/search", get(search_get).post(search_post))
        .route(
            "/api/v1/users/:user_id/cache/invalidate",
            post(invalidate_cache),
        )
        .route(
            "/api/v1/users/:user_id/bookmarks/:bookmark_id/open",
            post(record_open),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}

/// CORS layer for a list of allowed origins. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

// =============================================================================
// SEARCH
// =============================================================================

async fn search_post(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;
    run_search(&state, request).await
}

/// Query-string form of a search request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub user_id: String,
    #[serde(default, alias = "query")]
    pub q: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub special_filters: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub matching_distance: Option<f64>,
}

impl SearchParams {
    /// Convert to a [`SearchRequest`], rejecting unknown enum values.
    pub fn into_request(self) -> Result<SearchRequest, ApiError> {
        let types = split_list(self.types.as_deref())
            .map(|items| {
                items
                    .iter()
                    .map(|t| t.parse::<ContentType>())
                    .collect::<tidemark_core::Result<Vec<_>>>()
            })
            .transpose()?;
        let special_filters = split_list(self.special_filters.as_deref())
            .map(|items| {
                items
                    .iter()
                    .map(|f| f.parse::<SpecialFilter>())
                    .collect::<tidemark_core::Result<Vec<_>>>()
            })
            .transpose()?;

        Ok(SearchRequest {
            user_id: self.user_id,
            query: self.q,
            tags: split_list(self.tags.as_deref()),
            types,
            special_filters,
            limit: self.limit,
            cursor: self.cursor.filter(|c| !c.trim().is_empty()),
            matching_distance: self.matching_distance,
        })
    }
}

fn split_list(raw: Option<&str>) -> Option<Vec<String>> {
    let items: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

async fn search_get(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params?;
    run_search(&state, params.into_request()?).await
}

async fn run_search(
    state: &AppState,
    request: SearchRequest,
) -> Result<Json<SearchResponse>, ApiError> {
    let response = state.engine.search(&request).await?;
    debug!(
        subsystem = "api",
        user_id = %request.user_id,
        result_count = response.bookmarks.len(),
        from_cache = response.from_cache,
        "Search served"
    );
    Ok(Json(response))
}

// =============================================================================
// CACHE AND OPEN EVENTS
// =============================================================================

async fn invalidate_cache(
    State(state): State<AppState>,
    user_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(user_id) = user_id?;
    let removed = state.engine.invalidate_user(&user_id).await;
    info!(subsystem = "api", user_id = %user_id, removed, "Search cache invalidated");
    Ok(Json(json!({ "removed": removed })))
}

async fn record_open(
    State(state): State<AppState>,
    path: Result<Path<(String, Uuid)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((user_id, bookmark_id)) = path?;
    state.engine.record_open(&user_id, bookmark_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// HEALTH
// =============================================================================

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (database, pool) = match &state.database {
        None => ("not_configured", None),
        Some(db) => match db.ping().await {
            Ok(()) => ("ok", Some(tidemark_db::log_pool_metrics(db.pool()))),
            Err(e) => {
                warn!(subsystem = "api", error = %e, "Database health check failed");
                ("unreachable", None)
            }
        },
    };
    let search_cache = state.engine.search_cache();
    let healthy = database != "unreachable";

    let body = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "pool": pool,
        "cache": {
            "backend": search_cache.backend_name(),
            "connected": search_cache.is_connected().await,
            "search": state.engine.search_cache_stats(),
            "embedding": state.engine.embedding_cache_stats(),
        },
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> SearchParams {
        serde_json::from_value(json!({ "userId": "u1", "q": query })).unwrap()
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(Some(" rust, ,async ")),
            Some(vec!["rust".to_string(), "async".to_string()])
        );
        assert_eq!(split_list(Some(" , ")), None);
        assert_eq!(split_list(None), None);
    }

    #[test]
    fn test_params_into_request() {
        let mut p = params("tokio");
        p.tags = Some("rust,async".into());
        p.types = Some("article,video".into());
        p.special_filters = Some("unread".into());
        p.cursor = Some("  ".into());
        let request = p.into_request().unwrap();
        assert_eq!(request.query.as_deref(), Some("tokio"));
        assert_eq!(request.tags.unwrap(), vec!["rust", "async"]);
        assert_eq!(
            request.types.unwrap(),
            vec![ContentType::Article, ContentType::Video]
        );
        assert_eq!(request.special_filters.unwrap(), vec![SpecialFilter::Unread]);
        assert!(request.cursor.is_none());
    }

    #[test]
    fn test_params_reject_unknown_type() {
        let mut p = params("tokio");
        p.types = Some("hologram".into());
        assert!(matches!(p.into_request(), Err(ApiError::BadRequest(_))));
    }
}
