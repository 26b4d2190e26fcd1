//! Batch recomputation of the recommendation tables
//!
//! Every job replaces all rows of its natural key, so reruns converge on the
//! same table. CPU-bound scoring runs on a dedicated rayon pool behind
//! `spawn_blocking`; store I/O stays on the async runtime.
//!
//! Trending runs take a per-period async lock: two runs for the same period
//! queue behind each other, different periods proceed independently.

use ahash::{AHashMap, AHashSet};
use catalog_storage::{
    FrequentlyBoughtTogetherRow, Order, Page, Product, ProductFilter, ProductId,
    ProductRecommendationRow, ProductStatus, Shopper, SimilarityRow, SortSpec, TrendingPeriod,
    TrendingRow, UserId,
};
use chrono::Utc;
use dashmap::DashMap;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::engine::RecommendationEngine;
use crate::errors::{CatalogError, Result};
use crate::features::recommendation::domain::{co_occurrence, content_similarity, model::top_n};

/// What one job touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Natural keys rewritten (products, periods or users)
    pub subjects: usize,
    /// Rows written across those keys
    pub rows: usize,
    /// Interactions removed by pruning
    pub pruned: usize,
}

impl BatchReport {
    fn merge(self, other: BatchReport) -> BatchReport {
        BatchReport {
            subjects: self.subjects + other.subjects,
            rows: self.rows + other.rows,
            pruned: self.pruned + other.pruned,
        }
    }
}

pub struct RecommendationBatch {
    engine: Arc<RecommendationEngine>,
    pool: Arc<rayon::ThreadPool>,
    period_locks: DashMap<TrendingPeriod, Arc<Mutex<()>>>,
}

impl RecommendationBatch {
    pub fn new(engine: Arc<RecommendationEngine>) -> Result<Self> {
        let threads = engine.config.effective_batch_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("catalog-batch-{}", i))
            .build()
            .map_err(|e| CatalogError::Batch(format!("failed to build worker pool: {}", e)))?;
        debug!(threads, "batch worker pool ready");
        Ok(Self {
            engine,
            pool: Arc::new(pool),
            period_locks: DashMap::new(),
        })
    }

    /// Run `job` on the batch pool without blocking the runtime
    async fn on_pool<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || pool.install(job))
            .await
            .map_err(|e| CatalogError::Batch(format!("batch task failed: {}", e)))
    }

    fn period_lock(&self, period: TrendingPeriod) -> Arc<Mutex<()>> {
        Arc::clone(self.period_locks.entry(period).or_default().value())
    }

    async fn active_products(&self) -> Result<Vec<Product>> {
        let snapshot = self.engine.products.snapshot().await?;
        let (products, _) = snapshot
            .find_by_predicate(&ProductFilter::active(), &SortSpec::default(), Page::unbounded())
            .await?;
        Ok(products)
    }

    async fn subject(&self, product_id: ProductId) -> Result<Product> {
        let snapshot = self.engine.products.snapshot().await?;
        snapshot
            .get_by_ids(&[product_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::not_found("product", product_id))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Similarity
    // ═══════════════════════════════════════════════════════════════════════

    /// Rebuild similarity rows for every active product
    #[instrument(skip(self))]
    pub async fn recompute_similar(&self) -> Result<BatchReport> {
        let started = Instant::now();
        let catalog = Arc::new(self.active_products().await?);
        let (min, top) = (self.engine.config.min_similarity, self.engine.config.similar_top_n);

        let table = self
            .on_pool({
                let catalog = Arc::clone(&catalog);
                move || {
                    catalog
                        .par_iter()
                        .map(|subject| (subject.id, similar_to(subject, &catalog, min, top)))
                        .collect::<Vec<_>>()
                }
            })
            .await?;

        let report = self.write_similar(table).await?;
        info!(?report, elapsed_ms = started.elapsed().as_millis() as u64, "similarity recomputed");
        Ok(report)
    }

    /// Rebuild similarity rows for one product
    #[instrument(skip(self))]
    pub async fn recompute_similar_for(&self, product_id: ProductId) -> Result<BatchReport> {
        let subject = self.subject(product_id).await?;
        let catalog = self.active_products().await?;
        let (min, top) = (self.engine.config.min_similarity, self.engine.config.similar_top_n);

        let scored = if subject.status == ProductStatus::Active {
            self.on_pool(move || similar_to(&subject, &catalog, min, top)).await?
        } else {
            Vec::new()
        };
        self.write_similar(vec![(product_id, scored)]).await
    }

    async fn write_similar(&self, table: Vec<(ProductId, Vec<(ProductId, f64)>)>) -> Result<BatchReport> {
        let now = Utc::now();
        let mut report = BatchReport::default();
        for (product_id, scored) in table {
            let rows: Vec<SimilarityRow> = scored
                .into_iter()
                .map(|(similar_id, score)| SimilarityRow {
                    product_id,
                    similar_id,
                    score,
                    updated_at: now,
                })
                .collect();
            report.subjects += 1;
            report.rows += rows.len();
            self.engine.cache.replace_similar(product_id, rows).await?;
        }
        Ok(report)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Frequently bought together
    // ═══════════════════════════════════════════════════════════════════════

    /// Rebuild co-purchase rows for every active product from the full order history
    #[instrument(skip(self))]
    pub async fn recompute_frequently_bought_together(&self) -> Result<BatchReport> {
        let started = Instant::now();
        let orders = Arc::new(self.engine.orders.list_orders(None).await?);
        let active: Arc<AHashSet<ProductId>> =
            Arc::new(self.active_products().await?.into_iter().map(|p| p.id).collect());
        let (min, top) = (
            self.engine.config.min_co_occurrence,
            self.engine.config.bought_together_top_n,
        );

        let table = self
            .on_pool(move || {
                let mut index: AHashMap<ProductId, Vec<usize>> = AHashMap::new();
                for (i, order) in orders.iter().enumerate() {
                    for id in &order.product_ids {
                        index.entry(*id).or_default().push(i);
                    }
                }
                let mut subjects: Vec<ProductId> = active.iter().copied().collect();
                subjects.sort_unstable();
                subjects
                    .par_iter()
                    .map(|&subject| {
                        let containing = index
                            .get(&subject)
                            .into_iter()
                            .flatten()
                            .map(|&i| &orders[i]);
                        (subject, bought_with(subject, containing, &active, min, top))
                    })
                    .collect::<Vec<_>>()
            })
            .await?;

        let report = self.write_bought_together(table).await?;
        info!(?report, elapsed_ms = started.elapsed().as_millis() as u64, "co-purchases recomputed");
        Ok(report)
    }

    /// Rebuild co-purchase rows for one product
    #[instrument(skip(self))]
    pub async fn recompute_frequently_bought_together_for(
        &self,
        product_id: ProductId,
    ) -> Result<BatchReport> {
        let subject = self.subject(product_id).await?;
        let scored = if subject.status == ProductStatus::Active {
            let orders = self.engine.orders.orders_containing(product_id).await?;
            let active: AHashSet<ProductId> =
                self.active_products().await?.into_iter().map(|p| p.id).collect();
            bought_with(
                product_id,
                &orders,
                &active,
                self.engine.config.min_co_occurrence,
                self.engine.config.bought_together_top_n,
            )
        } else {
            Vec::new()
        };
        self.write_bought_together(vec![(product_id, scored)]).await
    }

    async fn write_bought_together(
        &self,
        table: Vec<(ProductId, Vec<(ProductId, f64)>)>,
    ) -> Result<BatchReport> {
        let now = Utc::now();
        let mut report = BatchReport::default();
        for (product_id, scored) in table {
            let rows: Vec<FrequentlyBoughtTogetherRow> = scored
                .into_iter()
                .map(|(related_id, frequency)| FrequentlyBoughtTogetherRow {
                    product_id,
                    related_id,
                    frequency: frequency as u32,
                    updated_at: now,
                })
                .collect();
            report.subjects += 1;
            report.rows += rows.len();
            self.engine
                .cache
                .replace_frequently_bought_together(product_id, rows)
                .await?;
        }
        Ok(report)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Trending
    // ═══════════════════════════════════════════════════════════════════════

    /// Replace every trending row of `period`
    #[instrument(skip(self))]
    pub async fn recompute_trending(&self, period: TrendingPeriod) -> Result<BatchReport> {
        let lock = self.period_lock(period);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let scored = self.engine.live_trend_scores(period, now).await?;
        let ids: Vec<ProductId> = scored.iter().map(|(id, _)| *id).collect();
        let snapshot = self.engine.products.snapshot().await?;
        let active: AHashSet<ProductId> = snapshot
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .filter(|p| p.status == ProductStatus::Active)
            .map(|p| p.id)
            .collect();

        let rows: Vec<TrendingRow> = top_n(scored, usize::MAX)
            .into_iter()
            .filter(|(id, _)| active.contains(id))
            .map(|(product_id, score)| TrendingRow {
                product_id,
                period,
                score,
                updated_at: now,
            })
            .collect();
        let report = BatchReport {
            subjects: 1,
            rows: rows.len(),
            pruned: 0,
        };
        self.engine.cache.replace_trending(period, rows).await?;
        info!(period = period.as_str(), rows = report.rows, "trending recomputed");
        Ok(report)
    }

    /// All periods, concurrently
    pub async fn recompute_all_trending(&self) -> Result<BatchReport> {
        let (daily, weekly, monthly) = tokio::join!(
            self.recompute_trending(TrendingPeriod::Daily),
            self.recompute_trending(TrendingPeriod::Weekly),
            self.recompute_trending(TrendingPeriod::Monthly),
        );
        Ok(daily?.merge(weekly?).merge(monthly?))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Personalized
    // ═══════════════════════════════════════════════════════════════════════

    /// Replace the precomputed list of one user
    #[instrument(skip(self))]
    pub async fn recompute_personalized(&self, user_id: UserId) -> Result<BatchReport> {
        let shopper = Shopper::User(user_id);
        let affinity = self.engine.affinity(&shopper).await?;
        let snapshot = self.engine.products.snapshot().await?;
        let scored = self.engine.affinity_scores(&*snapshot, &affinity).await?;

        let now = Utc::now();
        let rows: Vec<ProductRecommendationRow> =
            top_n(scored, self.engine.config.personalized_top_n)
                .into_iter()
                .map(|(product_id, score)| ProductRecommendationRow {
                    user_id,
                    product_id,
                    score,
                    updated_at: now,
                })
                .collect();
        let report = BatchReport {
            subjects: 1,
            rows: rows.len(),
            pruned: 0,
        };
        self.engine.cache.replace_recommendations(user_id, rows).await?;
        Ok(report)
    }

    /// Every user with interactions inside the affinity lookback
    pub async fn recompute_all_personalized(&self) -> Result<BatchReport> {
        let since = Utc::now() - self.engine.config.affinity_lookback();
        let mut users: Vec<UserId> = self
            .engine
            .interactions
            .query_window(since)
            .await?
            .into_iter()
            .filter_map(|i| i.user_id)
            .collect();
        users.sort_unstable();
        users.dedup();

        let mut report = BatchReport::default();
        for user_id in users {
            report = report.merge(self.recompute_personalized(user_id).await?);
        }
        info!(users = report.subjects, rows = report.rows, "personalized lists recomputed");
        Ok(report)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Retention
    // ═══════════════════════════════════════════════════════════════════════

    /// Delete interactions older than the retention window
    pub async fn prune_interactions(&self) -> Result<BatchReport> {
        let cutoff = Utc::now() - self.engine.config.interaction_retention();
        let pruned = self.engine.interactions.prune_before(cutoff).await?;
        info!(pruned, %cutoff, "interactions pruned");
        Ok(BatchReport {
            pruned,
            ..BatchReport::default()
        })
    }

    /// Every job, global scope
    pub async fn run_all(&self) -> Result<BatchReport> {
        let report = self
            .recompute_similar()
            .await?
            .merge(self.recompute_frequently_bought_together().await?)
            .merge(self.recompute_all_trending().await?)
            .merge(self.recompute_all_personalized().await?)
            .merge(self.prune_interactions().await?);
        Ok(report)
    }
}

/// Scored neighbours of `subject` above `min`, best `top` kept
fn similar_to(subject: &Product, catalog: &[Product], min: f64, top: usize) -> Vec<(ProductId, f64)> {
    let scored = catalog
        .iter()
        .filter(|other| other.id != subject.id)
        .map(|other| (other.id, content_similarity(subject, other)))
        .filter(|(_, score)| *score >= min && *score > 0.0)
        .collect();
    top_n(scored, top)
}

fn bought_with<'a>(
    subject: ProductId,
    orders: impl IntoIterator<Item = &'a Order>,
    active: &AHashSet<ProductId>,
    min: u32,
    top: usize,
) -> Vec<(ProductId, f64)> {
    let scored = co_occurrence(subject, orders)
        .into_iter()
        .filter(|(id, n)| *n >= min && active.contains(id))
        .map(|(id, n)| (id, n as f64))
        .collect();
    top_n(scored, top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecommendationConfig;
    use crate::features::recommendation::domain::Source;
    use crate::metrics::EngineMetrics;
    use catalog_storage::{
        InMemoryInteractionLog, InMemoryOrderHistory, InMemoryProductStore,
        InMemoryRecommendationCache, Interaction, InteractionKind, InteractionLogStore,
        RecommendationCacheStore,
    };
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    struct Fixture {
        engine: Arc<RecommendationEngine>,
        batch: RecommendationBatch,
        log: InMemoryInteractionLog,
        cache: InMemoryRecommendationCache,
    }

    fn fixture(orders: Vec<Order>) -> Fixture {
        let products = InMemoryProductStore::with_products([
            Product::new(1, "Wireless Mouse", "M1", 30.0, 10)
                .with_brand(1)
                .with_tags([1, 2]),
            Product::new(2, "Wired Mouse", "M2", 15.0, 10)
                .with_brand(1)
                .with_tags([1]),
            Product::new(3, "Kettle", "K1", 40.0, 20).with_tags([9]),
            Product::new(4, "Retro Mouse", "M3", 10.0, 10)
                .with_brand(1)
                .with_status(ProductStatus::Archived),
        ]);
        let log = InMemoryInteractionLog::new();
        let cache = InMemoryRecommendationCache::new();
        let config = RecommendationConfig {
            batch_threads: 2,
            ..RecommendationConfig::default()
        };
        let engine = Arc::new(RecommendationEngine::new(
            Arc::new(products),
            Arc::new(log.clone()),
            Arc::new(InMemoryOrderHistory::with_orders(orders)),
            Arc::new(cache.clone()),
            config,
            Arc::new(EngineMetrics::unregistered().unwrap()),
        ));
        let batch = RecommendationBatch::new(Arc::clone(&engine)).unwrap();
        Fixture {
            engine,
            batch,
            log,
            cache,
        }
    }

    #[tokio::test]
    async fn test_similarity_batch_is_idempotent() {
        let f = fixture(Vec::new());
        let first = f.batch.recompute_similar().await.unwrap();
        assert_eq!(first.subjects, 3);

        let rows = f.cache.similar(1).await.unwrap();
        let ids: Vec<ProductId> = rows.iter().map(|r| r.similar_id).collect();
        assert_eq!(ids, vec![2]);

        let second = f.batch.recompute_similar().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(f.cache.similar(1).await.unwrap().len(), 1);

        let served = f.engine.similar(1, 5).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_similar_for_unknown_product() {
        let f = fixture(Vec::new());
        assert!(matches!(
            f.batch.recompute_similar_for(42).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bought_together_batch_min_two_orders() {
        let f = fixture(vec![
            Order::new(1, [1, 2, 3]),
            Order::new(2, [1, 2]),
            Order::new(3, [2, 3]),
            Order::new(4, [1, 4]),
            Order::new(5, [1, 4]),
        ]);
        f.batch.recompute_frequently_bought_together().await.unwrap();

        let of = |rows: Vec<FrequentlyBoughtTogetherRow>| -> Vec<(ProductId, u32)> {
            rows.into_iter().map(|r| (r.related_id, r.frequency)).collect()
        };
        // Archived product 4 never appears despite two shared orders
        assert_eq!(of(f.cache.frequently_bought_together(1).await.unwrap()), vec![(2, 2)]);
        assert_eq!(
            of(f.cache.frequently_bought_together(2).await.unwrap()),
            vec![(1, 2), (3, 2)]
        );
        assert_eq!(of(f.cache.frequently_bought_together(3).await.unwrap()), vec![(2, 2)]);

        f.batch.recompute_frequently_bought_together_for(1).await.unwrap();
        assert_eq!(of(f.cache.frequently_bought_together(1).await.unwrap()), vec![(2, 2)]);
    }

    #[tokio::test]
    async fn test_trending_batch_replaces_period_rows() {
        let f = fixture(Vec::new());
        f.cache
            .replace_trending(
                TrendingPeriod::Daily,
                vec![TrendingRow {
                    product_id: 3,
                    period: TrendingPeriod::Daily,
                    score: 9.0,
                    updated_at: Utc::now() - Duration::hours(5),
                }],
            )
            .await
            .unwrap();
        let shopper = Shopper::Session("s".into());
        f.log
            .append(Interaction::new(&shopper, 1, InteractionKind::Cart, 3.0))
            .await
            .unwrap();

        let report = f.batch.recompute_trending(TrendingPeriod::Daily).await.unwrap();
        assert_eq!(report.rows, 1);
        let rows = f.cache.trending(TrendingPeriod::Daily).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, 1);

        let served = f.engine.trending(TrendingPeriod::Daily, 5).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_same_period_runs_are_serialized() {
        let f = fixture(Vec::new());
        let lock = f.batch.period_lock(TrendingPeriod::Daily);
        let _held = lock.lock().await;

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            f.batch.recompute_trending(TrendingPeriod::Daily),
        )
        .await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            f.batch.recompute_trending(TrendingPeriod::Weekly),
        )
        .await;
        assert!(matches!(other, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn test_personalized_batch_feeds_cache() {
        let f = fixture(Vec::new());
        f.engine
            .record_interaction(&Shopper::User(7), 1, InteractionKind::Purchase)
            .await
            .unwrap();
        let report = f.batch.recompute_all_personalized().await.unwrap();
        assert_eq!(report.subjects, 1);

        let served = f.engine.personalized(&Shopper::User(7), 5).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_prune_drops_only_expired() {
        let f = fixture(Vec::new());
        let shopper = Shopper::User(1);
        f.log
            .append(Interaction::new(&shopper, 1, InteractionKind::View, 1.0).at(Utc::now() - Duration::days(400)))
            .await
            .unwrap();
        f.log
            .append(Interaction::new(&shopper, 2, InteractionKind::View, 1.0))
            .await
            .unwrap();
        let report = f.batch.prune_interactions().await.unwrap();
        assert_eq!(report.pruned, 1);
        assert_eq!(f.log.len(), 1);
    }
}
