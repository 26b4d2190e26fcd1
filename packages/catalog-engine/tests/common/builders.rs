//! Test data builders

use catalog_engine::config::EngineConfig;
use catalog_engine::{CatalogEngine, CatalogStores, EngineMetrics};
use catalog_storage::{
    Brand, Category, InMemoryAnalyticsRecorder, InMemoryCategoryStore, InMemoryFilterSetStore,
    InMemoryInteractionLog, InMemoryOrderHistory, InMemoryPreferenceStore, InMemoryProductStore,
    InMemoryRecommendationCache, InMemorySuggestionStore, InMemoryTaxonomyStore, Order, Product,
    SuggestionEntry, Tag,
};
use std::sync::Arc;

use super::fixtures::init_tracing;

/// Engine plus concrete handles on every in-memory store it was wired with
pub struct Harness {
    pub engine: CatalogEngine,
    pub products: InMemoryProductStore,
    pub interactions: InMemoryInteractionLog,
    pub orders: InMemoryOrderHistory,
    pub cache: InMemoryRecommendationCache,
    pub suggestions: InMemorySuggestionStore,
    pub analytics: InMemoryAnalyticsRecorder,
    pub preferences: InMemoryPreferenceStore,
}

/// Builder for a [`Harness`]
#[derive(Default)]
pub struct HarnessBuilder {
    config: EngineConfig,
    products: Vec<Product>,
    categories: Vec<Category>,
    brands: Vec<Brand>,
    tags: Vec<Tag>,
    orders: Vec<Order>,
    suggestions: Vec<SuggestionEntry>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_products(mut self, products: impl IntoIterator<Item = Product>) -> Self {
        self.products.extend(products);
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories.extend(categories);
        self
    }

    pub fn with_brands(mut self, brands: impl IntoIterator<Item = Brand>) -> Self {
        self.brands.extend(brands);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn with_orders(mut self, orders: impl IntoIterator<Item = Order>) -> Self {
        self.orders.extend(orders);
        self
    }

    pub fn with_suggestions(mut self, entries: impl IntoIterator<Item = SuggestionEntry>) -> Self {
        self.suggestions.extend(entries);
        self
    }

    pub fn build(self) -> Harness {
        init_tracing();
        let products = InMemoryProductStore::with_products(self.products);
        let taxonomy = InMemoryTaxonomyStore::new();
        for brand in self.brands {
            taxonomy.insert_brand(brand);
        }
        for tag in self.tags {
            taxonomy.insert_tag(tag);
        }
        let interactions = InMemoryInteractionLog::new();
        let orders = InMemoryOrderHistory::with_orders(self.orders);
        let cache = InMemoryRecommendationCache::new();
        let suggestions = InMemorySuggestionStore::with_entries(self.suggestions);
        let analytics = InMemoryAnalyticsRecorder::new();
        let preferences = InMemoryPreferenceStore::new();

        let stores = CatalogStores {
            products: Arc::new(products.clone()),
            categories: Arc::new(InMemoryCategoryStore::with_categories(self.categories)),
            taxonomy: Arc::new(taxonomy),
            interactions: Arc::new(interactions.clone()),
            orders: Arc::new(orders.clone()),
            recommendation_cache: Arc::new(cache.clone()),
            suggestions: Arc::new(suggestions.clone()),
            analytics: Arc::new(analytics.clone()),
            preferences: Arc::new(preferences.clone()),
            filter_sets: Arc::new(InMemoryFilterSetStore::new()),
        };
        let config = self.config.build().expect("valid test config");
        let metrics = Arc::new(EngineMetrics::unregistered().expect("metrics"));
        let engine = CatalogEngine::with_metrics(config, stores, metrics).expect("engine");

        Harness {
            engine,
            products,
            interactions,
            orders,
            cache,
            suggestions,
            analytics,
            preferences,
        }
    }
}
