//! The bookmark search pipeline.
//!
//! A request is validated, looked up in the search cache, and on a miss run
//! under an overall deadline: classify, run the selected strategies
//! concurrently, merge, boost by open frequency, rank, paginate. The page
//! is then written back to the cache with a lifetime chosen by query type.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use tidemark_cache::{CacheStats, CacheStore, EmbeddingCache, SearchCache};
use tidemark_core::defaults::{SEARCH_DEADLINE_SECS, STRATEGY_CANDIDATE_LIMIT, VECTOR_TOP_K};
use tidemark_core::{
    BookmarkStore, BrowseCriteria, CommonFilter, EmbeddingBackend, Error, OpenCountSource,
    QueryType, Result, SearchPage, SearchRequest, SearchResponse, SearchResult, StrategyKind,
};

use crate::boost::boost_results;
use crate::classifier::{classify, QueryClass};
use crate::combiner::{combine_results, StrategyResults};
use crate::ranking::{paginate, sort_search_results};
use crate::strategies::{domain_search, tag_search, vector_search};

/// Configuration for the search engine.
#[derive(Debug, Clone)]
pub struct SearchEngineConfig {
    /// Deadline for an uncached search
    pub deadline: Duration,
    /// Size of the unthresholded vector fallback tier
    pub vector_top_k: usize,
    /// Cap on candidates fetched per strategy
    pub candidate_limit: usize,
}

impl Default for SearchEngineConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(SEARCH_DEADLINE_SECS),
            vector_top_k: VECTOR_TOP_K,
            candidate_limit: STRATEGY_CANDIDATE_LIMIT,
        }
    }
}

impl SearchEngineConfig {
    /// Defaults, with the deadline overridable by `TIDEMARK_SEARCH_DEADLINE_SECS`.
    pub fn from_env() -> Self {
        let deadline_secs = std::env::var("TIDEMARK_SEARCH_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(SEARCH_DEADLINE_SECS);
        Self::default().with_deadline(Duration::from_secs(deadline_secs))
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_vector_top_k(mut self, top_k: usize) -> Self {
        self.vector_top_k = top_k.max(1);
        self
    }

    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit.max(1);
        self
    }
}

/// Bookmark search engine.
///
/// Collaborators are injected; clones share them.
#[derive(Clone)]
pub struct BookmarkSearchEngine {
    store: Arc<dyn BookmarkStore>,
    opens: Arc<dyn OpenCountSource>,
    embedder: Arc<dyn EmbeddingBackend>,
    search_cache: SearchCache,
    embedding_cache: EmbeddingCache,
    config: SearchEngineConfig,
}

impl BookmarkSearchEngine {
    /// Create an engine whose caches share `cache_store`.
    pub fn new(
        store: Arc<dyn BookmarkStore>,
        opens: Arc<dyn OpenCountSource>,
        embedder: Arc<dyn EmbeddingBackend>,
        cache_store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            store,
            opens,
            embedder,
            search_cache: SearchCache::new(cache_store.clone()),
            embedding_cache: EmbeddingCache::new(cache_store),
            config: SearchEngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchEngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SearchEngineConfig {
        &self.config
    }

    pub fn search_cache(&self) -> &SearchCache {
        &self.search_cache
    }

    pub fn search_cache_stats(&self) -> CacheStats {
        self.search_cache.stats()
    }

    pub fn embedding_cache_stats(&self) -> CacheStats {
        self.embedding_cache.stats()
    }

    /// Run a search.
    #[instrument(
        skip(self, request),
        fields(subsystem = "search", component = "engine", op = "search", user_id = %request.user_id)
    )]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        request.validate()?;

        if let Some(cached) = self.search_cache.get(request).await {
            debug!(query_type = %cached.query_type, "Serving search from cache");
            return Ok(SearchResponse::from_page(
                cached.page,
                cached.query_time_ms,
                true,
            ));
        }

        let start = Instant::now();
        let deadline = self.config.deadline;
        let (page, query_type) = tokio::time::timeout(deadline, self.execute(request))
            .await
            .map_err(|_| {
                let ms = deadline.as_millis() as u64;
                warn!(deadline_ms = ms, "Search exceeded its deadline");
                Error::Timeout(ms)
            })??;
        let query_time_ms = start.elapsed().as_millis() as u64;

        self.search_cache
            .set(request, &page, query_type, query_time_ms)
            .await;

        info!(
            query_type = %query_type,
            result_count = page.bookmarks.len(),
            has_more = page.has_more,
            duration_ms = query_time_ms,
            "Search complete"
        );
        Ok(SearchResponse::from_page(page, query_time_ms, false))
    }

    /// Drop every cached page for a user. Call after any bookmark mutation.
    pub async fn invalidate_user(&self, user_id: &str) -> u64 {
        self.search_cache.invalidate_user(user_id).await
    }

    /// Record that a user opened a bookmark, then invalidate their cache.
    pub async fn record_open(&self, user_id: &str, bookmark_id: Uuid) -> Result<()> {
        self.opens.record_open(user_id, bookmark_id).await?;
        self.invalidate_user(user_id).await;
        Ok(())
    }

    async fn execute(&self, request: &SearchRequest) -> Result<(SearchPage, QueryType)> {
        let tags = request.tag_names();
        let class = classify(request.query_text(), !tags.is_empty());
        debug!(class = ?class, tag_count = tags.len(), "Query classified");

        if !class.is_search() {
            let page = self.browse(request).await?;
            return Ok((page, QueryType::DefaultBrowse));
        }

        let filter = CommonFilter::from_request(request, true);
        let results = self.run_strategies(request, &filter, &tags, &class).await?;
        let query_type = QueryType::from_strategies(&results.ran());

        let mut merged = combine_results(results);
        self.apply_boost(&request.user_id, &mut merged).await;
        sort_search_results(&mut merged);

        let page = paginate(merged, request.cursor_id()?, request.page_size());
        Ok((page, query_type))
    }

    /// Newest-first listing straight from storage, any status.
    async fn browse(&self, request: &SearchRequest) -> Result<SearchPage> {
        let limit = request.page_size();
        let filter = CommonFilter::from_request(request, false);
        let criteria = BrowseCriteria::new(filter, request.cursor_id()?, limit + 1);

        let mut bookmarks = self.store.browse(&criteria).await?;
        let has_more = bookmarks.len() > limit;
        bookmarks.truncate(limit);
        let next_cursor = if has_more {
            bookmarks.last().map(|b| b.id)
        } else {
            None
        };

        Ok(SearchPage {
            bookmarks,
            next_cursor,
            has_more,
            total_count: None,
        })
    }

    /// Run the strategies the classification calls for.
    ///
    /// With a single strategy its failure fails the request. With several,
    /// failures are logged and dropped unless all of them failed.
    async fn run_strategies(
        &self,
        request: &SearchRequest,
        filter: &CommonFilter,
        tags: &[String],
        class: &QueryClass,
    ) -> Result<StrategyResults> {
        let run_tag = !tags.is_empty();
        let domain = match class {
            QueryClass::Domain(domain) => Some(domain.as_str()),
            _ => None,
        };
        let run_vector = matches!(class, QueryClass::General) && !request.query_text().is_empty();

        let tag_fut = async {
            if run_tag {
                Some(self.tag_strategy(filter, tags).await)
            } else {
                None
            }
        };
        let domain_fut = async {
            match domain {
                Some(domain) => Some(self.domain_strategy(filter, domain).await),
                None => None,
            }
        };
        let vector_fut = async {
            if run_vector {
                Some(self.vector_strategy(request, filter).await)
            } else {
                None
            }
        };
        let (tag, domain_outcome, vector) = futures::join!(tag_fut, domain_fut, vector_fut);

        let attempted = [&tag, &domain_outcome, &vector]
            .iter()
            .filter(|outcome| outcome.is_some())
            .count();

        let mut results = StrategyResults::default();
        let mut first_error: Option<Error> = None;
        for (kind, outcome) in [
            (StrategyKind::Tag, tag),
            (StrategyKind::Domain, domain_outcome),
            (StrategyKind::Vector, vector),
        ] {
            let slot = match kind {
                StrategyKind::Tag => &mut results.tag,
                StrategyKind::Domain => &mut results.domain,
                StrategyKind::Vector => &mut results.vector,
            };
            match outcome {
                None => {}
                Some(Ok(found)) => *slot = Some(found),
                Some(Err(e)) if attempted == 1 => return Err(e),
                Some(Err(e)) => {
                    warn!(strategy = %kind, error = %e, "Strategy failed, continuing without it");
                    first_error.get_or_insert(e);
                }
            }
        }

        if results.ran().is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        // A domain query that finds nothing falls back to semantic search,
        // unless the tag filter already produced hits.
        let tag_hits = results.tag.as_ref().is_some_and(|found| !found.is_empty());
        if results.domain.as_ref().is_some_and(Vec::is_empty) && results.vector.is_none() && !tag_hits {
            debug!("Domain strategy empty, falling back to vector search");
            match self.vector_strategy(request, filter).await {
                Ok(found) => results.vector = Some(found),
                Err(e) => warn!(error = %e, "Vector fallback failed, returning domain results"),
            }
        }

        Ok(results)
    }

    async fn tag_strategy(&self, filter: &CommonFilter, tags: &[String]) -> Result<Vec<SearchResult>> {
        tag_search(self.store.as_ref(), filter, tags, self.config.candidate_limit).await
    }

    async fn domain_strategy(&self, filter: &CommonFilter, domain: &str) -> Result<Vec<SearchResult>> {
        domain_search(self.store.as_ref(), filter, domain, self.config.candidate_limit).await
    }

    async fn vector_strategy(
        &self,
        request: &SearchRequest,
        filter: &CommonFilter,
    ) -> Result<Vec<SearchResult>> {
        let embedding = self
            .embedding_cache
            .get_or_compute(request.query_text(), self.embedder.as_ref())
            .await?;

        let outcome = vector_search(
            self.store.as_ref(),
            filter,
            &embedding,
            request.matching_distance_or_default(),
            self.config.vector_top_k,
            self.config.candidate_limit,
        )
        .await?;
        debug!(tier = %outcome.tier, result_count = outcome.results.len(), "Vector tier settled");
        Ok(outcome.results)
    }

    /// Apply the open-frequency boost. Open counts are best effort.
    async fn apply_boost(&self, user_id: &str, results: &mut [SearchResult]) {
        if results.is_empty() {
            return;
        }
        let ids: Vec<Uuid> = results.iter().map(|r| r.id).collect();
        match self.opens.open_counts(user_id, &ids).await {
            Ok(counts) => boost_results(results, &counts),
            Err(e) => warn!(error = %e, "Open counts unavailable, skipping frequency boost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SearchEngineConfig::default()
            .with_deadline(Duration::from_millis(250))
            .with_vector_top_k(0)
            .with_candidate_limit(50);
        assert_eq!(config.deadline, Duration::from_millis(250));
        assert_eq!(config.vector_top_k, 1);
        assert_eq!(config.candidate_limit, 50);
    }

    #[test]
    fn test_config_defaults() {
        let config = SearchEngineConfig::default();
        assert_eq!(config.deadline, Duration::from_secs(SEARCH_DEADLINE_SECS));
        assert_eq!(config.vector_top_k, VECTOR_TOP_K);
    }
}
