//! Store ports
//!
//! Narrow async interfaces the engine is constructed with. Implementations
//! are plain data access: no ranking, no fallbacks, no caching policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::filter::{GroupKey, GroupValue, Page, ProductFilter, SortSpec};
use super::models::*;
use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Products
// ═══════════════════════════════════════════════════════════════════════════

/// Product store
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Immutable read view; all reads of one request go through it
    async fn snapshot(&self) -> Result<Arc<dyn ProductSnapshot>>;

    async fn upsert_product(&self, product: Product) -> Result<()>;

    /// Attach a tag; returns `false` when it was already attached
    async fn add_tag(&self, product_id: ProductId, tag_id: TagId) -> Result<bool>;
}

/// Consistent read view over the product table
#[async_trait]
pub trait ProductSnapshot: Send + Sync {
    /// Matching products in `sort` order, windowed by `page`, plus the
    /// pre-pagination total
    async fn find_by_predicate(
        &self,
        filter: &ProductFilter,
        sort: &SortSpec,
        page: Page,
    ) -> Result<(Vec<Product>, usize)>;

    /// Products by id, in the order requested; unknown ids are skipped
    async fn get_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    async fn count_by_predicate(&self, filter: &ProductFilter) -> Result<u64>;

    async fn count_by_group(
        &self,
        filter: &ProductFilter,
        key: &GroupKey,
    ) -> Result<HashMap<GroupValue, u64>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Taxonomy
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get_node(&self, id: CategoryId) -> Result<Option<Category>>;

    async fn get_children(&self, id: CategoryId) -> Result<Vec<Category>>;

    async fn list_all(&self) -> Result<Vec<Category>>;

    async fn upsert(&self, category: Category) -> Result<()>;
}

#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    async fn list_brands(&self) -> Result<Vec<Brand>>;

    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn list_attributes(&self) -> Result<Vec<Attribute>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Behaviour
// ═══════════════════════════════════════════════════════════════════════════

/// Append-only interaction log
#[async_trait]
pub trait InteractionLogStore: Send + Sync {
    async fn append(&self, interaction: Interaction) -> Result<()>;

    async fn query_by_product(
        &self,
        product_id: ProductId,
        kind: Option<InteractionKind>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Interaction>>;

    async fn query_by_user(
        &self,
        user_id: UserId,
        kind: Option<InteractionKind>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Interaction>>;

    /// Every interaction at or after `since`
    async fn query_window(&self, since: DateTime<Utc>) -> Result<Vec<Interaction>>;

    /// Delete interactions older than `cutoff`; returns how many were removed
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

#[async_trait]
pub trait OrderHistoryStore: Send + Sync {
    async fn orders_containing(&self, product_id: ProductId) -> Result<Vec<Order>>;

    async fn list_orders(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Order>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Derived rows
// ═══════════════════════════════════════════════════════════════════════════

/// Precomputed recommendation tables
///
/// `replace_*` overwrites every row of the natural key, so reruns are
/// idempotent. Reads of an absent key return an empty list.
#[async_trait]
pub trait RecommendationCacheStore: Send + Sync {
    async fn similar(&self, product_id: ProductId) -> Result<Vec<SimilarityRow>>;

    async fn replace_similar(&self, product_id: ProductId, rows: Vec<SimilarityRow>)
        -> Result<()>;

    async fn frequently_bought_together(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<FrequentlyBoughtTogetherRow>>;

    async fn replace_frequently_bought_together(
        &self,
        product_id: ProductId,
        rows: Vec<FrequentlyBoughtTogetherRow>,
    ) -> Result<()>;

    async fn trending(&self, period: TrendingPeriod) -> Result<Vec<TrendingRow>>;

    async fn replace_trending(&self, period: TrendingPeriod, rows: Vec<TrendingRow>)
        -> Result<()>;

    async fn recommendations_for(&self, user_id: UserId)
        -> Result<Vec<ProductRecommendationRow>>;

    async fn replace_recommendations(
        &self,
        user_id: UserId,
        rows: Vec<ProductRecommendationRow>,
    ) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Suggestions & analytics
// ═══════════════════════════════════════════════════════════════════════════

/// Autocomplete entries keyed by `(kind, value)`
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    async fn get(&self, kind: SuggestionKind, value: &str) -> Result<Option<SuggestionEntry>>;

    async fn upsert(&self, entry: SuggestionEntry) -> Result<()>;

    /// Atomically bump `search_count`, creating the entry if missing;
    /// returns the new count
    async fn increment_search(&self, kind: SuggestionKind, value: &str) -> Result<u64>;

    /// Atomically bump `click_count`; returns the new count
    async fn increment_click(&self, kind: SuggestionKind, value: &str) -> Result<u64>;

    /// Entries whose value starts with, contains, or is trigram-similar
    /// (at least `min_similarity`) to `query`
    async fn search(
        &self,
        query: &str,
        kinds: &[SuggestionKind],
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<SuggestionEntry>>;

    /// Entries with a synonym that starts with `query`
    async fn by_synonym(
        &self,
        query: &str,
        kinds: &[SuggestionKind],
        limit: usize,
    ) -> Result<Vec<SuggestionEntry>>;

    /// Entries whose value equals one of `values` (case-insensitive)
    async fn by_values(
        &self,
        values: &[String],
        kinds: &[SuggestionKind],
    ) -> Result<Vec<SuggestionEntry>>;

    async fn trending(&self, kinds: &[SuggestionKind], limit: usize)
        -> Result<Vec<SuggestionEntry>>;
}

/// Durable search/click log
#[async_trait]
pub trait AnalyticsRecorder: Send + Sync {
    async fn record_search(&self, event: SearchEvent) -> Result<()>;

    async fn record_click(
        &self,
        kind: SuggestionKind,
        value: &str,
        shopper: Option<&Shopper>,
    ) -> Result<()>;

    /// Most frequent queries since `since` that start with `prefix`
    async fn popular_queries(
        &self,
        since: DateTime<Utc>,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<QueryPopularity>>;

    /// Most recent distinct queries of `shopper` that start with `prefix`
    async fn history(
        &self,
        shopper: &Shopper,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn personalization_enabled(&self, user_id: UserId) -> Result<bool>;
}

/// Saved filter presets
#[async_trait]
pub trait FilterSetStore: Send + Sync {
    /// Fails with `Conflict` when the owner already has a set with that name
    async fn save(&self, filter_set: FilterSet) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<FilterSet>>;

    async fn list(&self, owner: &Shopper) -> Result<Vec<FilterSet>>;

    /// Returns the new usage count
    async fn increment_usage(&self, id: Uuid) -> Result<u64>;
}
