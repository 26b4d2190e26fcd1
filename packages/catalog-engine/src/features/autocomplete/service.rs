//! AutocompleteService
//!
//! Sources, fetched concurrently:
//! - fuzzy: prefix/substring/trigram match on suggestion values
//! - synonyms: entries with a matching synonym, plus entries named by the
//!   synonyms of fuzzy hits
//! - trending entries matching the query
//! - personalized: products the user interacted with (authenticated, opted in)
//! - popular queries over a timeframe (TTL-cached)
//! - the user's own query history (authenticated)

use ahash::AHashMap;
use catalog_storage::{
    text, AnalyticsRecorder, InteractionLogStore, PreferenceStore, ProductId, ProductStore,
    QueryPopularity, SearchEvent, Shopper, SuggestionEntry, SuggestionKind, SuggestionStore,
};
use chrono::{Duration, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::config::AutocompleteConfig;
use crate::errors::{CatalogError, Result};
use crate::features::autocomplete::domain::{
    merge, AutocompleteRequest, AutocompleteResponse, SourceFlags, Suggestion, Timeframe,
};
use crate::metrics::EngineMetrics;

type PopularKey = (Timeframe, String);

pub struct AutocompleteService {
    suggestions: Arc<dyn SuggestionStore>,
    analytics: Arc<dyn AnalyticsRecorder>,
    preferences: Arc<dyn PreferenceStore>,
    interactions: Arc<dyn InteractionLogStore>,
    products: Arc<dyn ProductStore>,
    popular_cache: Cache<PopularKey, Arc<Vec<QueryPopularity>>>,
    config: AutocompleteConfig,
    metrics: Arc<EngineMetrics>,
}

impl AutocompleteService {
    pub fn new(
        suggestions: Arc<dyn SuggestionStore>,
        analytics: Arc<dyn AnalyticsRecorder>,
        preferences: Arc<dyn PreferenceStore>,
        interactions: Arc<dyn InteractionLogStore>,
        products: Arc<dyn ProductStore>,
        config: AutocompleteConfig,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let popular_cache = Cache::builder()
            .max_capacity(config.popular_cache_capacity)
            .time_to_live(config.popular_cache_ttl())
            .build();
        Self {
            suggestions,
            analytics,
            preferences,
            interactions,
            products,
            popular_cache,
            config,
            metrics,
        }
    }

    #[instrument(skip(self, request), fields(query = %request.query, limit = ?request.limit))]
    pub async fn autocomplete(&self, request: &AutocompleteRequest) -> Result<AutocompleteResponse> {
        let started = Instant::now();
        self.metrics.autocomplete_requests.inc();

        let query = request.normalized_query();
        if query.is_empty() {
            return Ok(AutocompleteResponse::default());
        }
        let kinds = request.kind_filter();
        let shopper = request.shopper();
        let limit = self.config.source_limit;

        let (fuzzy, by_synonym, trending, popular, history, personalized) = tokio::try_join!(
            async {
                self.suggestions
                    .search(&query, &kinds, self.config.fuzzy_threshold, limit)
                    .await
                    .map_err(CatalogError::from)
            },
            async {
                self.suggestions
                    .by_synonym(&query, &kinds, limit)
                    .await
                    .map_err(CatalogError::from)
            },
            self.trending(request, &query, &kinds),
            self.popular(request, &query),
            self.history(request, shopper.as_ref(), &query),
            self.personalized(request, shopper.as_ref(), &query),
        )?;

        let synonyms: Vec<String> = fuzzy
            .iter()
            .flat_map(|e| e.synonyms.iter().cloned())
            .collect();
        let named_by_synonym = if synonyms.is_empty() {
            Vec::new()
        } else {
            self.suggestions.by_values(&synonyms, &kinds).await?
        };

        let now = Utc::now();
        let candidates = [
            (fuzzy, SourceFlags::NONE),
            (by_synonym, SourceFlags::NONE),
            (named_by_synonym, SourceFlags::NONE),
            (trending, SourceFlags::TRENDING),
            (popular, SourceFlags::POPULAR),
            (history, SourceFlags::HISTORY),
            (personalized, SourceFlags::PERSONALIZED),
        ]
        .into_iter()
        .flat_map(|(entries, flags)| {
            entries
                .into_iter()
                .map(move |entry| (entry, flags))
        })
        .map(|(entry, flags)| Suggestion::from_entry(&entry, flags, &self.config, now));

        let mut response =
            AutocompleteResponse::assemble(merge(candidates), request.effective_limit(&self.config));
        let elapsed = started.elapsed();
        response.query_time_ms = elapsed.as_millis() as u64;
        self.metrics.autocomplete_latency.observe(elapsed.as_secs_f64());
        debug!(total = response.total, returned = response.suggestions.len(), "autocomplete complete");
        Ok(response)
    }

    async fn trending(
        &self,
        request: &AutocompleteRequest,
        query: &str,
        kinds: &[SuggestionKind],
    ) -> Result<Vec<SuggestionEntry>> {
        if !request.include_trending {
            return Ok(Vec::new());
        }
        let entries = self.suggestions.trending(kinds, self.config.source_limit).await?;
        Ok(entries
            .into_iter()
            .filter(|e| text::normalize(&e.value).contains(query))
            .collect())
    }

    /// Popular queries of the timeframe starting with `query`
    async fn popular(&self, request: &AutocompleteRequest, query: &str) -> Result<Vec<SuggestionEntry>> {
        if !request.include_popular || !request.wants(SuggestionKind::Query) {
            return Ok(Vec::new());
        }
        let key = (request.timeframe, query.to_string());
        let popular = match self.popular_cache.get(&key).await {
            Some(hit) => hit,
            None => {
                let since = Utc::now() - request.timeframe.window();
                let fetched = Arc::new(
                    self.analytics
                        .popular_queries(since, query, self.config.source_limit)
                        .await?,
                );
                self.popular_cache.insert(key, Arc::clone(&fetched)).await;
                fetched
            }
        };
        Ok(popular
            .iter()
            .map(|p| {
                SuggestionEntry::new(SuggestionKind::Query, p.query.clone())
                    .with_counts(p.count, 0)
                    .updated(p.last_searched)
            })
            .collect())
    }

    async fn history(
        &self,
        request: &AutocompleteRequest,
        shopper: Option<&Shopper>,
        query: &str,
    ) -> Result<Vec<SuggestionEntry>> {
        let shopper = match shopper {
            Some(s) if s.is_authenticated() => s,
            _ => return Ok(Vec::new()),
        };
        if !request.include_history || !request.wants(SuggestionKind::Query) {
            return Ok(Vec::new());
        }
        let history = self
            .analytics
            .history(shopper, query, self.config.source_limit)
            .await?;
        Ok(history
            .into_iter()
            .map(|h| SuggestionEntry::new(SuggestionKind::Query, h.query).updated(h.searched_at))
            .collect())
    }

    /// Names of products the user recently interacted with that match `query`
    async fn personalized(
        &self,
        request: &AutocompleteRequest,
        shopper: Option<&Shopper>,
        query: &str,
    ) -> Result<Vec<SuggestionEntry>> {
        let Some(user_id) = shopper.and_then(|s| s.user_id()) else {
            return Ok(Vec::new());
        };
        if !request.include_personalized || !request.wants(SuggestionKind::Product) {
            return Ok(Vec::new());
        }
        if !self.preferences.personalization_enabled(user_id).await? {
            debug!(user_id, "personalization disabled");
            return Ok(Vec::new());
        }

        let since = Utc::now() - Duration::days(self.config.fresh_days);
        let mut ids: Vec<ProductId> = self
            .interactions
            .query_by_user(user_id, None, since)
            .await?
            .into_iter()
            .map(|i| i.product_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.products.snapshot().await?;
        let names: Vec<String> = snapshot
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| p.name)
            .filter(|name| text::normalize(name).contains(query))
            .collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let known: AHashMap<String, SuggestionEntry> = self
            .suggestions
            .by_values(&names, &[SuggestionKind::Product])
            .await?
            .into_iter()
            .map(|e| (text::normalize(&e.value), e))
            .collect();
        Ok(names
            .into_iter()
            .map(|name| {
                known
                    .get(&text::normalize(&name))
                    .cloned()
                    .unwrap_or_else(|| SuggestionEntry::new(SuggestionKind::Product, name))
            })
            .collect())
    }

    /// Count a submitted query and log it; blank queries are ignored
    ///
    /// The result count is not known at this layer and is logged as 0.
    pub async fn record_search(&self, query: &str, shopper: Option<&Shopper>) -> Result<u64> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(0);
        }
        let count = self
            .suggestions
            .increment_search(SuggestionKind::Query, query)
            .await?;
        self.analytics
            .record_search(SearchEvent::new(query, shopper.cloned(), 0))
            .await?;
        Ok(count)
    }

    /// Count a click on a suggestion and log it
    pub async fn record_click(
        &self,
        kind: SuggestionKind,
        value: &str,
        shopper: Option<&Shopper>,
    ) -> Result<u64> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(0);
        }
        let count = self.suggestions.increment_click(kind, value).await?;
        self.analytics.record_click(kind, value, shopper).await?;
        Ok(count)
    }
}
