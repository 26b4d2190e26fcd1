//! Pure scoring rules shared by the live fallbacks and the batch jobs

use ahash::{AHashMap, AHashSet};
use catalog_storage::{
    text, BrandId, CategoryId, Interaction, InteractionKind, Order, Product, ProductId,
};

// ═══════════════════════════════════════════════════════════════════════════
// Taxonomy
// ═══════════════════════════════════════════════════════════════════════════

/// 3 = same category and brand, 2 = same category, 1 = same brand
pub fn related_score(subject: &Product, candidate: &Product) -> Option<f64> {
    let same_category = subject.category_id == candidate.category_id;
    let same_brand = subject.brand_id.is_some() && subject.brand_id == candidate.brand_id;
    match (same_category, same_brand) {
        (true, true) => Some(3.0),
        (true, false) => Some(2.0),
        (false, true) => Some(1.0),
        (false, false) => None,
    }
}

const SIMILARITY_CATEGORY: f64 = 0.4;
const SIMILARITY_BRAND: f64 = 0.2;
const SIMILARITY_TAGS: f64 = 0.3;
const SIMILARITY_NAME: f64 = 0.1;

fn jaccard<T: Eq + std::hash::Hash + Copy>(a: &[T], b: &[T]) -> f64 {
    let left: AHashSet<T> = a.iter().copied().collect();
    let right: AHashSet<T> = b.iter().copied().collect();
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    shared as f64 / (left.len() + right.len() - shared) as f64
}

/// Content similarity in `0.0..=1.0`
pub fn content_similarity(a: &Product, b: &Product) -> f64 {
    let mut score = 0.0;
    if a.category_id == b.category_id {
        score += SIMILARITY_CATEGORY;
    }
    if a.brand_id.is_some() && a.brand_id == b.brand_id {
        score += SIMILARITY_BRAND;
    }
    score += SIMILARITY_TAGS * jaccard(&a.tags, &b.tags);
    score += SIMILARITY_NAME * text::trigram_similarity(&a.name, &b.name);
    score
}

// ═══════════════════════════════════════════════════════════════════════════
// Behaviour
// ═══════════════════════════════════════════════════════════════════════════

/// Number of distinct orders each other product shares with `subject`
pub fn co_occurrence<'a>(
    subject: ProductId,
    orders: impl IntoIterator<Item = &'a Order>,
) -> AHashMap<ProductId, u32> {
    let mut counts = AHashMap::new();
    for order in orders {
        if !order.contains(subject) {
            continue;
        }
        let distinct: AHashSet<ProductId> = order.product_ids.iter().copied().collect();
        for other in distinct.into_iter().filter(|&id| id != subject) {
            *counts.entry(other).or_insert(0) += 1;
        }
    }
    counts
}

/// Summed interaction weight per product; zero and negative totals dropped
pub fn trend_scores<'a>(
    interactions: impl IntoIterator<Item = &'a Interaction>,
) -> AHashMap<ProductId, f64> {
    let mut scores: AHashMap<ProductId, f64> = AHashMap::new();
    for interaction in interactions {
        *scores.entry(interaction.product_id).or_insert(0.0) += interaction.weight;
    }
    scores.retain(|_, score| *score > 0.0);
    scores
}

/// Interaction-weighted category and brand preferences of one shopper
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Affinity {
    pub categories: AHashMap<CategoryId, f64>,
    pub brands: AHashMap<BrandId, f64>,
    /// Products already viewed or purchased
    pub seen: AHashSet<ProductId>,
}

impl Affinity {
    /// `products` resolves interaction product ids; unknown ids are ignored
    pub fn build(interactions: &[Interaction], products: &AHashMap<ProductId, Product>) -> Self {
        let mut affinity = Affinity::default();
        for interaction in interactions {
            if matches!(interaction.kind, InteractionKind::View | InteractionKind::Purchase) {
                affinity.seen.insert(interaction.product_id);
            }
            let Some(product) = products.get(&interaction.product_id) else {
                continue;
            };
            *affinity.categories.entry(product.category_id).or_insert(0.0) += interaction.weight;
            if let Some(brand) = product.brand_id {
                *affinity.brands.entry(brand).or_insert(0.0) += interaction.weight;
            }
        }
        affinity
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.brands.is_empty()
    }

    /// Category affinity plus brand affinity of `product`
    pub fn product_score(&self, product: &Product) -> f64 {
        let category = self.categories.get(&product.category_id).copied().unwrap_or(0.0);
        let brand = product
            .brand_id
            .and_then(|b| self.brands.get(&b).copied())
            .unwrap_or(0.0);
        category + brand
    }

    /// Categories by affinity desc, ties by id asc
    pub fn ranked_categories(&self) -> Vec<(CategoryId, f64)> {
        ranked(&self.categories)
    }

    /// Brands by affinity desc, ties by id asc
    pub fn ranked_brands(&self) -> Vec<(BrandId, f64)> {
        ranked(&self.brands)
    }
}

fn ranked(map: &AHashMap<u64, f64>) -> Vec<(u64, f64)> {
    let mut out: Vec<(u64, f64)> = map.iter().map(|(k, v)| (*k, *v)).collect();
    out.sort_by(super::model::by_score_then_id);
    out
}
