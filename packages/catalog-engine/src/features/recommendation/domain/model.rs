//! Recommendation output types

use catalog_storage::{Product, ProductId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Related,
    Similar,
    FrequentlyBoughtTogether,
    Trending,
    Personalized,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Related,
        Strategy::Similar,
        Strategy::FrequentlyBoughtTogether,
        Strategy::Trending,
        Strategy::Personalized,
    ];

    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Related => "related",
            Strategy::Similar => "similar",
            Strategy::FrequentlyBoughtTogether => "frequently_bought_together",
            Strategy::Trending => "trending",
            Strategy::Personalized => "personalized",
        }
    }
}

/// Where a list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product: Product,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub strategy: Strategy,
    pub source: Source,
    pub items: Vec<Recommendation>,
}

impl Recommendations {
    pub fn ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|r| r.product.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Score desc, then id asc
pub fn by_score_then_id(a: &(ProductId, f64), b: &(ProductId, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Sort candidates deterministically and keep the first `limit`
pub fn top_n(mut scored: Vec<(ProductId, f64)>, limit: usize) -> Vec<(ProductId, f64)> {
    scored.sort_by(by_score_then_id);
    scored.truncate(limit);
    scored
}
