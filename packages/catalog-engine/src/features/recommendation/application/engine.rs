//! RecommendationEngine
//!
//! Every strategy reads its precomputed table first and falls back to a live
//! computation when the table has nothing usable. Live results are returned
//! as-is, never written back; only the batch jobs write the tables.

use ahash::{AHashMap, AHashSet};
use catalog_storage::{
    BrandId, CategoryId, Interaction, InteractionKind, InteractionLogStore, OrderHistoryStore,
    Page, Product, ProductFilter, ProductId, ProductSnapshot, ProductStatus, ProductStore,
    RecommendationCacheStore, Shopper, SortSpec, TrendingPeriod,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::RecommendationConfig;
use crate::errors::{CatalogError, Result};
use crate::features::recommendation::domain::{
    co_occurrence, model::top_n, related_score, trend_scores, Affinity, Recommendation,
    Recommendations, Source, Strategy,
};
use crate::metrics::EngineMetrics;

pub struct RecommendationEngine {
    pub(crate) products: Arc<dyn ProductStore>,
    pub(crate) interactions: Arc<dyn InteractionLogStore>,
    pub(crate) orders: Arc<dyn OrderHistoryStore>,
    pub(crate) cache: Arc<dyn RecommendationCacheStore>,
    pub(crate) config: RecommendationConfig,
    metrics: Arc<EngineMetrics>,
}

impl RecommendationEngine {
    pub fn new(
        products: Arc<dyn ProductStore>,
        interactions: Arc<dyn InteractionLogStore>,
        orders: Arc<dyn OrderHistoryStore>,
        cache: Arc<dyn RecommendationCacheStore>,
        config: RecommendationConfig,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            products,
            interactions,
            orders,
            cache,
            config,
            metrics,
        }
    }

    /// 0 means the configured default; anything else is capped at `max_limit`
    fn clamp(&self, limit: usize) -> usize {
        if limit == 0 {
            self.config.default_limit
        } else {
            limit.min(self.config.max_limit)
        }
    }

    /// Append an interaction weighted by its kind
    pub async fn record_interaction(
        &self,
        shopper: &Shopper,
        product_id: ProductId,
        kind: InteractionKind,
    ) -> Result<Interaction> {
        let weight = self.config.interaction_weights.weight(kind);
        let interaction = Interaction::new(shopper, product_id, kind, weight);
        self.interactions.append(interaction.clone()).await?;
        Ok(interaction)
    }

    async fn subject(&self, snapshot: &dyn ProductSnapshot, id: ProductId) -> Result<Product> {
        snapshot
            .get_by_ids(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::not_found("product", id))
    }

    /// Resolve scored ids to active products, best first, skipping `exclude`
    async fn hydrate(
        &self,
        snapshot: &dyn ProductSnapshot,
        scored: Vec<(ProductId, f64)>,
        exclude: &AHashSet<ProductId>,
        limit: usize,
    ) -> Result<Vec<Recommendation>> {
        let scored: Vec<(ProductId, f64)> = top_n(scored, usize::MAX)
            .into_iter()
            .filter(|(id, _)| !exclude.contains(id))
            .collect();
        let ids: Vec<ProductId> = scored.iter().map(|(id, _)| *id).collect();
        let mut products: AHashMap<ProductId, Product> = snapshot
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut out = Vec::with_capacity(limit.min(scored.len()));
        for (id, score) in scored {
            if out.len() == limit {
                break;
            }
            match products.remove(&id) {
                Some(product) if product.status == ProductStatus::Active => {
                    out.push(Recommendation { product, score })
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn served(&self, strategy: Strategy, source: Source, items: Vec<Recommendation>) -> Recommendations {
        match source {
            Source::Cache => self.metrics.cache_hit(strategy.as_str()),
            Source::Live => self.metrics.cache_miss(strategy.as_str()),
        }
        debug!(strategy = strategy.as_str(), ?source, count = items.len(), "recommendations served");
        Recommendations {
            strategy,
            source,
            items,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Related
    // ═══════════════════════════════════════════════════════════════════════

    async fn related_scores(
        &self,
        snapshot: &dyn ProductSnapshot,
        subject: &Product,
    ) -> Result<Vec<(ProductId, f64)>> {
        let base = ProductFilter::active().excluding([subject.id]);
        let (mut candidates, _) = snapshot
            .find_by_predicate(
                &base.clone().with_categories([subject.category_id]),
                &SortSpec::default(),
                Page::unbounded(),
            )
            .await?;
        if let Some(brand) = subject.brand_id {
            let (same_brand, _) = snapshot
                .find_by_predicate(&base.with_brands([brand]), &SortSpec::default(), Page::unbounded())
                .await?;
            candidates.extend(same_brand);
        }

        let mut scored: AHashMap<ProductId, f64> = AHashMap::new();
        for candidate in &candidates {
            if let Some(score) = related_score(subject, candidate) {
                scored.insert(candidate.id, score);
            }
        }
        Ok(scored.into_iter().collect())
    }

    /// Active products sharing category and/or brand with `product_id`
    #[instrument(skip(self))]
    pub async fn related(&self, product_id: ProductId, limit: usize) -> Result<Recommendations> {
        let snapshot = self.products.snapshot().await?;
        let subject = self.subject(&*snapshot, product_id).await?;
        let scored = self.related_scores(&*snapshot, &subject).await?;
        let exclude: AHashSet<_> = [product_id].into_iter().collect();
        let items = self.hydrate(&*snapshot, scored, &exclude, self.clamp(limit)).await?;
        Ok(Recommendations {
            strategy: Strategy::Related,
            source: Source::Live,
            items,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Similar
    // ═══════════════════════════════════════════════════════════════════════

    /// Precomputed content similarity, else related-by-taxonomy
    #[instrument(skip(self))]
    pub async fn similar(&self, product_id: ProductId, limit: usize) -> Result<Recommendations> {
        let limit = self.clamp(limit);
        let snapshot = self.products.snapshot().await?;
        let subject = self.subject(&*snapshot, product_id).await?;
        let exclude: AHashSet<_> = [product_id].into_iter().collect();

        let rows = self.cache.similar(product_id).await?;
        if !rows.is_empty() {
            let scored = rows.iter().map(|r| (r.similar_id, r.score)).collect();
            let items = self.hydrate(&*snapshot, scored, &exclude, limit).await?;
            if !items.is_empty() {
                return Ok(self.served(Strategy::Similar, Source::Cache, items));
            }
        }

        let scored = self.related_scores(&*snapshot, &subject).await?;
        let items = self.hydrate(&*snapshot, scored, &exclude, limit).await?;
        Ok(self.served(Strategy::Similar, Source::Live, items))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Frequently bought together
    // ═══════════════════════════════════════════════════════════════════════

    /// Products sharing at least `min_co_occurrence` orders with `product_id`
    #[instrument(skip(self))]
    pub async fn frequently_bought_together(
        &self,
        product_id: ProductId,
        limit: usize,
    ) -> Result<Recommendations> {
        let limit = self.clamp(limit);
        let snapshot = self.products.snapshot().await?;
        self.subject(&*snapshot, product_id).await?;
        let exclude: AHashSet<_> = [product_id].into_iter().collect();

        let rows = self.cache.frequently_bought_together(product_id).await?;
        if !rows.is_empty() {
            let scored = rows.iter().map(|r| (r.related_id, r.frequency as f64)).collect();
            let items = self.hydrate(&*snapshot, scored, &exclude, limit).await?;
            if !items.is_empty() {
                return Ok(self.served(Strategy::FrequentlyBoughtTogether, Source::Cache, items));
            }
        }

        let orders = self.orders.orders_containing(product_id).await?;
        let scored: Vec<(ProductId, f64)> = co_occurrence(product_id, &orders)
            .into_iter()
            .filter(|(_, n)| *n >= self.config.min_co_occurrence)
            .map(|(id, n)| (id, n as f64))
            .collect();
        let items = self.hydrate(&*snapshot, scored, &exclude, limit).await?;
        Ok(self.served(Strategy::FrequentlyBoughtTogether, Source::Live, items))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Trending
    // ═══════════════════════════════════════════════════════════════════════

    /// Cached period rows while fresh, else summed interaction weight over
    /// the period's lookback window
    ///
    /// Cached rows are only served for products that still have weighted
    /// interactions inside the window; a hit that leaves nothing servable is
    /// a miss.
    #[instrument(skip(self))]
    pub async fn trending(&self, period: TrendingPeriod, limit: usize) -> Result<Recommendations> {
        let limit = self.clamp(limit);
        let now = Utc::now();
        let snapshot = self.products.snapshot().await?;
        let none = AHashSet::new();
        let live = self.live_trend_scores(period, now).await?;

        let rows = self.cache.trending(period).await?;
        let newest = rows.iter().map(|r| r.updated_at).max();
        match newest {
            Some(at) if now - at <= self.config.trending_staleness.max_staleness(period) => {
                let active: AHashSet<ProductId> = live.iter().map(|(id, _)| *id).collect();
                let scored = rows
                    .iter()
                    .filter(|r| active.contains(&r.product_id))
                    .map(|r| (r.product_id, r.score))
                    .collect();
                let items = self.hydrate(&*snapshot, scored, &none, limit).await?;
                if !items.is_empty() {
                    return Ok(self.served(Strategy::Trending, Source::Cache, items));
                }
                debug!(period = period.as_str(), rows = rows.len(), "trending cache has no active rows");
            }
            Some(at) => {
                debug!(period = period.as_str(), updated_at = %at, "trending cache stale");
            }
            None => {}
        }

        let items = self.hydrate(&*snapshot, live, &none, limit).await?;
        Ok(self.served(Strategy::Trending, Source::Live, items))
    }

    pub(crate) async fn live_trend_scores(
        &self,
        period: TrendingPeriod,
        now: DateTime<Utc>,
    ) -> Result<Vec<(ProductId, f64)>> {
        let window = self.interactions.query_window(now - period.lookback()).await?;
        Ok(trend_scores(&window).into_iter().collect())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Personalized
    // ═══════════════════════════════════════════════════════════════════════

    async fn shopper_interactions(&self, shopper: &Shopper) -> Result<Vec<Interaction>> {
        let since = Utc::now() - self.config.affinity_lookback();
        match shopper {
            Shopper::User(id) => Ok(self.interactions.query_by_user(*id, None, since).await?),
            Shopper::Session(_) => Ok(self
                .interactions
                .query_window(since)
                .await?
                .into_iter()
                .filter(|i| i.belongs_to(shopper))
                .collect()),
        }
    }

    /// Category/brand affinity of `shopper` over the lookback window
    pub async fn affinity(&self, shopper: &Shopper) -> Result<Affinity> {
        let interactions = self.shopper_interactions(shopper).await?;
        let mut ids: Vec<ProductId> = interactions.iter().map(|i| i.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let snapshot = self.products.snapshot().await?;
        let products: AHashMap<ProductId, Product> = snapshot
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(Affinity::build(&interactions, &products))
    }

    /// Unseen active products scored by the shopper's affinity
    pub(crate) async fn affinity_scores(
        &self,
        snapshot: &dyn ProductSnapshot,
        affinity: &Affinity,
    ) -> Result<Vec<(ProductId, f64)>> {
        if affinity.is_empty() {
            return Ok(Vec::new());
        }
        let base = ProductFilter::active().excluding(affinity.seen.iter().copied());
        let mut candidates: AHashMap<ProductId, Product> = AHashMap::new();
        if !affinity.categories.is_empty() {
            let filter = base.clone().with_categories(affinity.categories.keys().copied());
            let (found, _) = snapshot
                .find_by_predicate(&filter, &SortSpec::default(), Page::unbounded())
                .await?;
            candidates.extend(found.into_iter().map(|p| (p.id, p)));
        }
        if !affinity.brands.is_empty() {
            let filter = base.with_brands(affinity.brands.keys().copied());
            let (found, _) = snapshot
                .find_by_predicate(&filter, &SortSpec::default(), Page::unbounded())
                .await?;
            candidates.extend(found.into_iter().map(|p| (p.id, p)));
        }
        Ok(candidates
            .values()
            .map(|p| (p.id, affinity.product_score(p)))
            .filter(|(_, score)| *score > 0.0)
            .collect())
    }

    /// Per-user cached rows, else live affinity matching
    #[instrument(skip(self))]
    pub async fn personalized(&self, shopper: &Shopper, limit: usize) -> Result<Recommendations> {
        let limit = self.clamp(limit);
        let snapshot = self.products.snapshot().await?;

        if let Some(user_id) = shopper.user_id() {
            let rows = self.cache.recommendations_for(user_id).await?;
            if !rows.is_empty() {
                let scored = rows.iter().map(|r| (r.product_id, r.score)).collect();
                let items = self.hydrate(&*snapshot, scored, &AHashSet::new(), limit).await?;
                if !items.is_empty() {
                    return Ok(self.served(Strategy::Personalized, Source::Cache, items));
                }
            }
        }

        let affinity = self.affinity(shopper).await?;
        let scored = self.affinity_scores(&*snapshot, &affinity).await?;
        let items = self.hydrate(&*snapshot, scored, &affinity.seen, limit).await?;
        Ok(self.served(Strategy::Personalized, Source::Live, items))
    }

    /// Categories the shopper interacts with most
    pub async fn category_affinity(
        &self,
        shopper: &Shopper,
        limit: usize,
    ) -> Result<Vec<(CategoryId, f64)>> {
        let mut ranked = self.affinity(shopper).await?.ranked_categories();
        ranked.truncate(self.clamp(limit));
        Ok(ranked)
    }

    /// Brands the shopper interacts with most
    pub async fn brand_affinity(&self, shopper: &Shopper, limit: usize) -> Result<Vec<(BrandId, f64)>> {
        let mut ranked = self.affinity(shopper).await?.ranked_brands();
        ranked.truncate(self.clamp(limit));
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_storage::{
        FrequentlyBoughtTogetherRow, InMemoryInteractionLog, InMemoryOrderHistory,
        InMemoryProductStore, InMemoryRecommendationCache, Order, SimilarityRow, TrendingRow,
    };
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    struct Fixture {
        engine: RecommendationEngine,
        log: InMemoryInteractionLog,
        orders: InMemoryOrderHistory,
        cache: InMemoryRecommendationCache,
        metrics: Arc<EngineMetrics>,
    }

    fn fixture() -> Fixture {
        let products = InMemoryProductStore::with_products([
            Product::new(1, "Phone", "P1", 500.0, 10).with_brand(1),
            Product::new(2, "Phone Pro", "P2", 900.0, 10).with_brand(1),
            Product::new(3, "Other Phone", "P3", 300.0, 10).with_brand(2),
            Product::new(4, "Charger", "C1", 20.0, 20).with_brand(1),
            Product::new(5, "Case", "C2", 15.0, 20),
            Product::new(6, "Old Phone", "P4", 100.0, 10)
                .with_brand(1)
                .with_status(ProductStatus::Archived),
        ]);
        let log = InMemoryInteractionLog::new();
        let orders = InMemoryOrderHistory::new();
        let cache = InMemoryRecommendationCache::new();
        let metrics = Arc::new(EngineMetrics::unregistered().unwrap());
        let engine = RecommendationEngine::new(
            Arc::new(products),
            Arc::new(log.clone()),
            Arc::new(orders.clone()),
            Arc::new(cache.clone()),
            RecommendationConfig::default(),
            Arc::clone(&metrics),
        );
        Fixture {
            engine,
            log,
            orders,
            cache,
            metrics,
        }
    }

    #[tokio::test]
    async fn test_related_ranks_category_and_brand() {
        let f = fixture();
        let related = f.engine.related(1, 10).await.unwrap();
        assert_eq!(related.ids(), vec![2, 3, 4]);
        let scores: Vec<f64> = related.items.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![3.0, 2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_unknown_subject_not_found() {
        let f = fixture();
        assert!(matches!(f.engine.related(99, 5).await, Err(CatalogError::NotFound(_))));
        assert!(matches!(f.engine.similar(99, 5).await, Err(CatalogError::NotFound(_))));
        assert!(matches!(
            f.engine.frequently_bought_together(99, 5).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_similar_prefers_cache_then_falls_back() {
        let f = fixture();
        let live = f.engine.similar(1, 10).await.unwrap();
        assert_eq!(live.source, Source::Live);
        assert_eq!(live.ids(), vec![2, 3, 4]);

        let now = Utc::now();
        f.cache
            .replace_similar(
                1,
                vec![
                    SimilarityRow { product_id: 1, similar_id: 5, score: 0.9, updated_at: now },
                    SimilarityRow { product_id: 1, similar_id: 6, score: 0.8, updated_at: now },
                ],
            )
            .await
            .unwrap();
        let cached = f.engine.similar(1, 10).await.unwrap();
        assert_eq!(cached.source, Source::Cache);
        // Archived product 6 is dropped
        assert_eq!(cached.ids(), vec![5]);
        assert!((f.metrics.cache_hit_rate("similar") - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fbt_cache_rows_by_frequency() {
        let f = fixture();
        let now = Utc::now();
        f.cache
            .replace_frequently_bought_together(
                1,
                vec![
                    FrequentlyBoughtTogetherRow { product_id: 1, related_id: 4, frequency: 3, updated_at: now },
                    FrequentlyBoughtTogetherRow { product_id: 1, related_id: 5, frequency: 7, updated_at: now },
                ],
            )
            .await
            .unwrap();
        let fbt = f.engine.frequently_bought_together(1, 10).await.unwrap();
        assert_eq!(fbt.source, Source::Cache);
        assert_eq!(fbt.ids(), vec![5, 4]);
    }

    #[tokio::test]
    async fn test_fbt_live_requires_min_co_occurrence() {
        let f = fixture();
        f.orders.push(Order::new(1, [1, 4, 5]));
        f.orders.push(Order::new(2, [1, 4]));
        let fbt = f.engine.frequently_bought_together(1, 10).await.unwrap();
        assert_eq!(fbt.source, Source::Live);
        assert_eq!(fbt.ids(), vec![4]);
        assert_eq!(fbt.items[0].score, 2.0);
    }

    #[tokio::test]
    async fn test_trending_live_sums_weights_in_window() {
        let f = fixture();
        let shopper = Shopper::User(1);
        let now = Utc::now();
        for (pid, kind, age) in [
            (1, InteractionKind::View, Duration::hours(1)),
            (1, InteractionKind::View, Duration::hours(2)),
            (2, InteractionKind::Purchase, Duration::hours(3)),
            (3, InteractionKind::Purchase, Duration::days(3)),
        ] {
            let weight = RecommendationConfig::default().interaction_weights.weight(kind);
            f.log
                .append(Interaction::new(&shopper, pid, kind, weight).at(now - age))
                .await
                .unwrap();
        }
        let daily = f.engine.trending(TrendingPeriod::Daily, 10).await.unwrap();
        assert_eq!(daily.ids(), vec![2, 1]);
        let weekly = f.engine.trending(TrendingPeriod::Weekly, 10).await.unwrap();
        assert_eq!(weekly.ids(), vec![2, 3, 1]);
    }

    fn trending_row(product_id: ProductId, score: f64, updated_at: DateTime<Utc>) -> TrendingRow {
        TrendingRow {
            product_id,
            period: TrendingPeriod::Daily,
            score,
            updated_at,
        }
    }

    #[tokio::test]
    async fn test_trending_fresh_cache_served_for_active_products() {
        let f = fixture();
        let now = Utc::now();
        f.engine
            .record_interaction(&Shopper::User(1), 4, InteractionKind::View)
            .await
            .unwrap();
        f.engine
            .record_interaction(&Shopper::User(1), 5, InteractionKind::View)
            .await
            .unwrap();
        f.cache
            .replace_trending(
                TrendingPeriod::Daily,
                vec![trending_row(5, 4.0, now), trending_row(4, 9.0, now), trending_row(3, 20.0, now)],
            )
            .await
            .unwrap();

        let daily = f.engine.trending(TrendingPeriod::Daily, 10).await.unwrap();
        assert_eq!(daily.source, Source::Cache);
        // Cached scores kept; 3 has no interaction in the window
        assert_eq!(daily.ids(), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_trending_cache_never_serves_idle_products() {
        let f = fixture();
        f.cache
            .replace_trending(
                TrendingPeriod::Daily,
                vec![trending_row(5, 4.0, Utc::now() - Duration::minutes(50))],
            )
            .await
            .unwrap();
        f.engine
            .record_interaction(&Shopper::User(1), 2, InteractionKind::Cart)
            .await
            .unwrap();

        let daily = f.engine.trending(TrendingPeriod::Daily, 10).await.unwrap();
        assert_eq!(daily.source, Source::Live);
        assert_eq!(daily.ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_trending_cache_of_archived_products_falls_back() {
        let f = fixture();
        f.engine
            .record_interaction(&Shopper::User(1), 6, InteractionKind::Purchase)
            .await
            .unwrap();
        f.engine
            .record_interaction(&Shopper::User(1), 1, InteractionKind::View)
            .await
            .unwrap();
        f.cache
            .replace_trending(TrendingPeriod::Daily, vec![trending_row(6, 50.0, Utc::now())])
            .await
            .unwrap();

        let daily = f.engine.trending(TrendingPeriod::Daily, 10).await.unwrap();
        assert_eq!(daily.source, Source::Live);
        assert_eq!(daily.ids(), vec![1]);
        assert_eq!(f.metrics.cache_hit_rate("trending"), 0.0);
    }

    #[tokio::test]
    async fn test_personalized_live_excludes_seen() {
        let f = fixture();
        let shopper = Shopper::User(9);
        f.engine
            .record_interaction(&shopper, 1, InteractionKind::Purchase)
            .await
            .unwrap();
        f.engine
            .record_interaction(&shopper, 4, InteractionKind::Cart)
            .await
            .unwrap();

        let recs = f.engine.personalized(&shopper, 10).await.unwrap();
        assert_eq!(recs.source, Source::Live);
        // Phone Pro: category 10 (5) + brand 1 (8); Other Phone: 5;
        // Charger (cart only) stays eligible: category 20 (3) + brand 1 (8)
        assert_eq!(recs.ids(), vec![2, 4, 3, 5]);
        assert!(!recs.ids().contains(&1));

        let categories = f.engine.category_affinity(&shopper, 10).await.unwrap();
        assert_eq!(categories, vec![(10, 5.0), (20, 3.0)]);
        let brands = f.engine.brand_affinity(&shopper, 10).await.unwrap();
        assert_eq!(brands, vec![(1, 8.0)]);
    }

    #[tokio::test]
    async fn test_anonymous_personalized_uses_session_history() {
        let f = fixture();
        let session = Shopper::Session("abc".into());
        f.engine
            .record_interaction(&session, 5, InteractionKind::View)
            .await
            .unwrap();
        let recs = f.engine.personalized(&session, 10).await.unwrap();
        assert_eq!(recs.ids(), vec![4]);

        let stranger = f.engine.personalized(&Shopper::User(404), 10).await.unwrap();
        assert!(stranger.is_empty());
    }
}
