//! SearchQueryEngine
//!
//! Request flow:
//! 1. validate the request (`InvalidFilter` before any store access)
//! 2. resolve it into a `ProductFilter` (category expansion, synonyms)
//! 3. take one product snapshot
//! 4. run the ranked query and, if asked, the facet fan-out concurrently
//!    against that snapshot, both bounded by the request deadline
//! 5. record the search event (best-effort)

use catalog_storage::{
    AnalyticsRecorder, AttributeConstraint, DateRange, Page, PriceRange, Product, ProductFilter,
    ProductSnapshot, ProductStore, SearchEvent, SortField, SortSpec, TextQuery,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant as StdInstant;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::SearchConfig;
use crate::errors::{CatalogError, Result};
use crate::features::category::CategoryHierarchyResolver;
use crate::features::facets::FacetComputer;
use crate::features::search::domain::{RelevanceScorer, SearchRequest, SearchResponse, SynonymIndex};
use crate::metrics::EngineMetrics;

pub struct SearchQueryEngine {
    products: Arc<dyn ProductStore>,
    categories: Arc<CategoryHierarchyResolver>,
    facets: Arc<FacetComputer>,
    analytics: Arc<dyn AnalyticsRecorder>,
    synonyms: SynonymIndex,
    config: SearchConfig,
    metrics: Arc<EngineMetrics>,
}

impl SearchQueryEngine {
    pub fn new(
        products: Arc<dyn ProductStore>,
        categories: Arc<CategoryHierarchyResolver>,
        facets: Arc<FacetComputer>,
        analytics: Arc<dyn AnalyticsRecorder>,
        config: SearchConfig,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            synonyms: SynonymIndex::new(&config.synonyms),
            products,
            categories,
            facets,
            analytics,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[instrument(skip(self, request), fields(query = ?request.text(), sort = ?request.sort_by))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let started = StdInstant::now();
        let deadline = Instant::now() + self.config.request_timeout();
        self.metrics.search_requests.inc();

        request.validate(&self.config)?;
        let filter = self.resolve_filter(request).await?;

        let snapshot = match tokio::time::timeout_at(deadline, self.products.snapshot()).await {
            Ok(snapshot) => snapshot?,
            Err(_) => return Err(self.timed_out(started)),
        };

        let main = tokio::time::timeout_at(deadline, self.run_query(&*snapshot, &filter, request));
        let facets = async {
            if request.include_facets {
                let selection = request.facet_selection();
                Some(
                    self.facets
                        .compute(Arc::clone(&snapshot), &filter, &selection, deadline)
                        .await,
                )
            } else {
                None
            }
        };
        let (main, facets) = tokio::join!(main, facets);

        let (products, total) = match main {
            Ok(result) => result?,
            Err(_) => return Err(self.timed_out(started)),
        };

        if let Some(query) = request.text() {
            if self.config.record_analytics {
                let event = SearchEvent::new(query, request.shopper.clone(), total);
                if let Err(e) = self.analytics.record_search(event).await {
                    warn!(error = %e, "failed to record search event");
                }
            }
        }

        let elapsed = started.elapsed();
        self.metrics.search_latency.observe(elapsed.as_secs_f64());
        debug!(total, returned = products.len(), elapsed_ms = elapsed.as_millis() as u64, "search complete");

        Ok(SearchResponse {
            products,
            total,
            facets,
            query_time_ms: elapsed.as_millis() as u64,
        })
    }

    fn timed_out(&self, started: StdInstant) -> CatalogError {
        self.metrics.search_timeouts.inc();
        let elapsed = started.elapsed();
        warn!(elapsed_ms = elapsed.as_millis() as u64, "search deadline exceeded");
        CatalogError::timeout("search", elapsed)
    }

    /// Turn a validated request into the predicate the store evaluates
    pub async fn resolve_filter(&self, request: &SearchRequest) -> Result<ProductFilter> {
        let text = request.text().map(|q| {
            TextQuery::new(q)
                .with_expansions(self.synonyms.expand(q))
                .with_threshold(self.config.trigram_threshold)
        });

        let category_ids = match &request.category_ids {
            Some(ids) => {
                let ids: BTreeSet<_> = ids.iter().copied().collect();
                Some(
                    self.categories
                        .expand(&ids, request.include_subcategories)
                        .await?,
                )
            }
            None => None,
        };

        let price = (request.price_min.is_some() || request.price_max.is_some())
            .then(|| PriceRange::new(request.price_min, request.price_max));
        let created = (request.created_after.is_some() || request.created_before.is_some())
            .then(|| DateRange {
                after: request.created_after,
                before: request.created_before,
            });
        let statuses = request
            .statuses
            .clone()
            .unwrap_or_else(|| self.config.default_statuses.clone());

        Ok(ProductFilter {
            text,
            category_ids,
            brand_ids: request.brand_ids.as_ref().map(|ids| ids.iter().copied().collect()),
            price,
            price_bucket: None,
            tags: request.tags.as_ref().map(|ids| ids.iter().copied().collect()),
            attributes: request
                .attributes
                .iter()
                .flatten()
                .map(|a| AttributeConstraint::new(a.attribute_id, a.term_ids.iter().copied()))
                .collect(),
            in_stock: request.in_stock,
            on_sale: request.on_sale,
            featured: request.featured,
            created,
            statuses: Some(statuses.into_iter().collect()),
            exclude_ids: BTreeSet::new(),
            now: Utc::now(),
        })
    }

    /// Page of matches plus the pre-pagination total
    async fn run_query(
        &self,
        snapshot: &dyn ProductSnapshot,
        filter: &ProductFilter,
        request: &SearchRequest,
    ) -> Result<(Vec<Product>, usize)> {
        let page = Page::new(request.offset, request.effective_limit(&self.config));
        let sort = SortSpec::new(request.sort_by, request.sort_order);

        if sort.field != SortField::Relevance {
            return Ok(snapshot.find_by_predicate(filter, &sort, page).await?);
        }

        let (matches, total) = snapshot
            .find_by_predicate(filter, &SortSpec::default(), Page::unbounded())
            .await?;
        let scorer = RelevanceScorer {
            weights: &self.config.weights,
            new_arrival_window: self.config.new_arrival_window(),
            now: filter.now,
        };
        let ranked = scorer.rank(matches, filter.text.as_ref());
        let products = page.apply(ranked).into_iter().map(|(p, _)| p).collect();
        Ok((products, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryConfig, FacetConfig};
    use catalog_storage::{
        Category, InMemoryAnalyticsRecorder, InMemoryCategoryStore, InMemoryProductStore,
        InMemoryTaxonomyStore, ProductFaults, SortOrder,
    };
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct Fixture {
        engine: SearchQueryEngine,
        products: InMemoryProductStore,
        analytics: InMemoryAnalyticsRecorder,
    }

    fn fixture(config: SearchConfig) -> Fixture {
        let products = InMemoryProductStore::with_products([
            Product::new(1, "Gaming Laptop", "LP-1", 1200.0, 2),
            Product::new(2, "Office Notebook", "NB-1", 700.0, 2),
            Product::new(3, "Laptop Sleeve", "SL-1", 25.0, 3),
            Product::new(4, "Desk Lamp", "DL-1", 40.0, 3),
        ]);
        let categories = InMemoryCategoryStore::with_categories([
            Category::new(1, "Computers", None),
            Category::new(2, "Laptops", Some(1)),
            Category::new(3, "Accessories", None),
        ]);
        let analytics = InMemoryAnalyticsRecorder::new();
        let metrics = Arc::new(EngineMetrics::unregistered().unwrap());
        let resolver = Arc::new(CategoryHierarchyResolver::new(
            Arc::new(categories),
            &CategoryConfig::default(),
        ));
        let facets = Arc::new(FacetComputer::new(
            Arc::new(InMemoryTaxonomyStore::new()),
            Arc::clone(&resolver),
            FacetConfig::default(),
            config.low_stock_threshold,
            Arc::clone(&metrics),
        ));
        let engine = SearchQueryEngine::new(
            Arc::new(products.clone()),
            resolver,
            facets,
            Arc::new(analytics.clone()),
            config,
            metrics,
        );
        Fixture {
            engine,
            products,
            analytics,
        }
    }

    fn ids(response: &SearchResponse) -> Vec<u64> {
        response.products.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_synonym_expansion_widens_match() {
        let f = fixture(
            SearchConfig::default().synonyms(vec![vec!["laptop".into(), "notebook".into()]]),
        );
        let request = SearchRequest::new()
            .query("laptop")
            .sort(SortField::Relevance, SortOrder::Desc);
        let response = f.engine.search(&request).await.unwrap();
        let mut found = ids(&response);
        found.sort();
        assert_eq!(found, vec![1, 2, 3]);
        assert_eq!(response.total, 3);
    }

    #[tokio::test]
    async fn test_category_filter_includes_subcategories() {
        let f = fixture(SearchConfig::default());
        let response = f
            .engine
            .search(&SearchRequest::new().categories([1]).sort(SortField::Price, SortOrder::Asc))
            .await
            .unwrap();
        assert_eq!(ids(&response), vec![2, 1]);

        let response = f
            .engine
            .search(&SearchRequest::new().categories([1]).without_subcategories())
            .await
            .unwrap();
        assert_eq!(response.total, 0);
    }

    #[tokio::test]
    async fn test_unknown_category_not_found() {
        let f = fixture(SearchConfig::default());
        let err = f
            .engine
            .search(&SearchRequest::new().categories([99]))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_filter_rejected_before_query() {
        let f = fixture(SearchConfig::default());
        f.products.set_faults(ProductFaults {
            read_latency: Some(Duration::from_secs(30)),
            ..ProductFaults::default()
        });
        let err = f
            .engine
            .search(&SearchRequest::new().price(Some(10.0), Some(5.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let f = fixture(SearchConfig::default().request_timeout_ms(100));
        f.products.set_faults(ProductFaults {
            read_latency: Some(Duration::from_secs(30)),
            ..ProductFaults::default()
        });
        let err = f
            .engine
            .search(&SearchRequest::new().query("laptop"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ComputationTimeout { .. }));
    }

    #[tokio::test]
    async fn test_pagination_keeps_total() {
        let f = fixture(SearchConfig::default());
        let response = f
            .engine
            .search(&SearchRequest::new().sort(SortField::Name, SortOrder::Asc).page(1, 2))
            .await
            .unwrap();
        assert_eq!(response.total, 4);
        assert_eq!(ids(&response), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_search_event_recorded_for_text_queries_only() {
        let f = fixture(SearchConfig::default());
        f.engine.search(&SearchRequest::new()).await.unwrap();
        f.engine
            .search(&SearchRequest::new().query("lamp"))
            .await
            .unwrap();
        let events = f.analytics.search_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].query, "lamp");
        assert_eq!(events[0].result_count, 1);
    }
}
