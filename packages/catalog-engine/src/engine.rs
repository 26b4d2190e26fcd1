//! CatalogEngine: one instance of every component, wired from a validated
//! configuration and a bundle of store handles

use catalog_storage::{
    AnalyticsRecorder, CategoryStore, FilterSetStore, InteractionLogStore, OrderHistoryStore,
    PreferenceStore, ProductId, ProductStore, RecommendationCacheStore, SuggestionStore, TagId,
    TaxonomyStore,
};
use prometheus::Registry;
use std::sync::Arc;
use tracing::info;

use crate::config::{EngineConfig, ValidatedConfig};
use crate::errors::Result;
use crate::features::autocomplete::{AutocompleteRequest, AutocompleteResponse, AutocompleteService};
use crate::features::category::CategoryHierarchyResolver;
use crate::features::facets::FacetComputer;
use crate::features::recommendation::{RecommendationBatch, RecommendationEngine};
use crate::features::search::{FilterSetService, SearchQueryEngine, SearchRequest, SearchResponse};
use crate::metrics::EngineMetrics;

/// Every collaborator the engine reads from or writes to
#[derive(Clone)]
pub struct CatalogStores {
    pub products: Arc<dyn ProductStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub taxonomy: Arc<dyn TaxonomyStore>,
    pub interactions: Arc<dyn InteractionLogStore>,
    pub orders: Arc<dyn OrderHistoryStore>,
    pub recommendation_cache: Arc<dyn RecommendationCacheStore>,
    pub suggestions: Arc<dyn SuggestionStore>,
    pub analytics: Arc<dyn AnalyticsRecorder>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub filter_sets: Arc<dyn FilterSetStore>,
}

pub struct CatalogEngine {
    config: EngineConfig,
    products: Arc<dyn ProductStore>,
    categories: Arc<CategoryHierarchyResolver>,
    search: SearchQueryEngine,
    filter_sets: FilterSetService,
    recommendations: Arc<RecommendationEngine>,
    batch: RecommendationBatch,
    autocomplete: AutocompleteService,
    metrics: Arc<EngineMetrics>,
}

impl CatalogEngine {
    /// Build the engine and register its metrics against `registry`
    pub fn new(config: ValidatedConfig, stores: CatalogStores, registry: &Registry) -> Result<Self> {
        let metrics = Arc::new(EngineMetrics::new(registry)?);
        Self::with_metrics(config, stores, metrics)
    }

    pub fn with_metrics(
        config: ValidatedConfig,
        stores: CatalogStores,
        metrics: Arc<EngineMetrics>,
    ) -> Result<Self> {
        let config = config.into_inner();

        let categories = Arc::new(CategoryHierarchyResolver::new(
            Arc::clone(&stores.categories),
            &config.category,
        ));
        let facets = Arc::new(FacetComputer::new(
            Arc::clone(&stores.taxonomy),
            Arc::clone(&categories),
            config.facets.clone(),
            config.search.low_stock_threshold,
            Arc::clone(&metrics),
        ));
        let search = SearchQueryEngine::new(
            Arc::clone(&stores.products),
            Arc::clone(&categories),
            facets,
            Arc::clone(&stores.analytics),
            config.search.clone(),
            Arc::clone(&metrics),
        );
        let recommendations = Arc::new(RecommendationEngine::new(
            Arc::clone(&stores.products),
            Arc::clone(&stores.interactions),
            Arc::clone(&stores.orders),
            Arc::clone(&stores.recommendation_cache),
            config.recommendation.clone(),
            Arc::clone(&metrics),
        ));
        let batch = RecommendationBatch::new(Arc::clone(&recommendations))?;
        let autocomplete = AutocompleteService::new(
            Arc::clone(&stores.suggestions),
            Arc::clone(&stores.analytics),
            Arc::clone(&stores.preferences),
            Arc::clone(&stores.interactions),
            Arc::clone(&stores.products),
            config.autocomplete.clone(),
            Arc::clone(&metrics),
        );

        info!(preset = ?config.get_preset(), "catalog engine ready");
        Ok(Self {
            filter_sets: FilterSetService::new(stores.filter_sets),
            products: stores.products,
            config,
            categories,
            search,
            recommendations,
            batch,
            autocomplete,
            metrics,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.search.search(request).await
    }

    pub async fn autocomplete(&self, request: &AutocompleteRequest) -> Result<AutocompleteResponse> {
        self.autocomplete.autocomplete(request).await
    }

    /// Suggestion counters (`record_search`, `record_click`)
    pub fn suggestions(&self) -> &AutocompleteService {
        &self.autocomplete
    }

    pub fn recommendations(&self) -> &RecommendationEngine {
        &self.recommendations
    }

    pub fn categories(&self) -> &CategoryHierarchyResolver {
        &self.categories
    }

    pub fn batch(&self) -> &RecommendationBatch {
        &self.batch
    }

    pub fn filter_sets(&self) -> &FilterSetService {
        &self.filter_sets
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Attach a tag; `false` when the product already carried it
    pub async fn tag_product(&self, product_id: ProductId, tag_id: TagId) -> Result<bool> {
        Ok(self.products.add_tag(product_id, tag_id).await?)
    }
}
