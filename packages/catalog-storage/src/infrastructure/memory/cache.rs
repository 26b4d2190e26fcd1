//! In-memory recommendation cache tables

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::models::{
    FrequentlyBoughtTogetherRow, ProductId, ProductRecommendationRow, SimilarityRow,
    TrendingPeriod, TrendingRow, UserId,
};
use crate::domain::ports::RecommendationCacheStore;
use crate::error::Result;

/// One map per derived table, keyed by the natural key `replace_*` overwrites
#[derive(Clone, Default)]
pub struct InMemoryRecommendationCache {
    similar: Arc<DashMap<ProductId, Vec<SimilarityRow>>>,
    bought_together: Arc<DashMap<ProductId, Vec<FrequentlyBoughtTogetherRow>>>,
    trending: Arc<DashMap<TrendingPeriod, Vec<TrendingRow>>>,
    per_user: Arc<DashMap<UserId, Vec<ProductRecommendationRow>>>,
}

impl InMemoryRecommendationCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<K, V>(map: &DashMap<K, Vec<V>>, key: &K) -> Vec<V>
where
    K: std::hash::Hash + Eq,
    V: Clone,
{
    map.get(key).map(|rows| rows.clone()).unwrap_or_default()
}

fn replace<K, V>(map: &DashMap<K, Vec<V>>, key: K, rows: Vec<V>)
where
    K: std::hash::Hash + Eq,
{
    if rows.is_empty() {
        map.remove(&key);
    } else {
        map.insert(key, rows);
    }
}

#[async_trait]
impl RecommendationCacheStore for InMemoryRecommendationCache {
    async fn similar(&self, product_id: ProductId) -> Result<Vec<SimilarityRow>> {
        Ok(read(&self.similar, &product_id))
    }

    async fn replace_similar(
        &self,
        product_id: ProductId,
        rows: Vec<SimilarityRow>,
    ) -> Result<()> {
        replace(&self.similar, product_id, rows);
        Ok(())
    }

    async fn frequently_bought_together(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<FrequentlyBoughtTogetherRow>> {
        Ok(read(&self.bought_together, &product_id))
    }

    async fn replace_frequently_bought_together(
        &self,
        product_id: ProductId,
        rows: Vec<FrequentlyBoughtTogetherRow>,
    ) -> Result<()> {
        replace(&self.bought_together, product_id, rows);
        Ok(())
    }

    async fn trending(&self, period: TrendingPeriod) -> Result<Vec<TrendingRow>> {
        Ok(read(&self.trending, &period))
    }

    async fn replace_trending(
        &self,
        period: TrendingPeriod,
        rows: Vec<TrendingRow>,
    ) -> Result<()> {
        replace(&self.trending, period, rows);
        Ok(())
    }

    async fn recommendations_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProductRecommendationRow>> {
        Ok(read(&self.per_user, &user_id))
    }

    async fn replace_recommendations(
        &self,
        user_id: UserId,
        rows: Vec<ProductRecommendationRow>,
    ) -> Result<()> {
        replace(&self.per_user, user_id, rows);
        Ok(())
    }
}
