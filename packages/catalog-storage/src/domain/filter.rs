//! Product predicate, sort, paging and grouping value types
//!
//! `ProductFilter` is the fully-resolved predicate a store evaluates: category
//! ids are already expanded to their descendants and synonym expansions are
//! already attached to the text query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::models::{
    AttributeId, BrandId, CategoryId, Product, ProductId, ProductStatus, StockState, TagId, TermId,
};
use crate::text::{self, DEFAULT_TRIGRAM_THRESHOLD};

// ═══════════════════════════════════════════════════════════════════════════
// Text query
// ═══════════════════════════════════════════════════════════════════════════

/// Free-text part of a predicate
///
/// A product matches when any of these holds:
/// - every query token prefix-matches a search-document token
/// - trigram similarity against name or sku reaches `trigram_threshold`
/// - the query is a substring of name, description or sku
/// - any synonym expansion is a substring of name, description or sku
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    pub raw: String,
    pub normalized: String,
    pub tokens: Vec<String>,
    pub expansions: Vec<String>,
    pub trigram_threshold: f64,
}

impl TextQuery {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            normalized: text::normalize(&raw),
            tokens: text::tokenize(&raw),
            raw,
            expansions: Vec::new(),
            trigram_threshold: DEFAULT_TRIGRAM_THRESHOLD,
        }
    }

    pub fn with_expansions(mut self, expansions: impl IntoIterator<Item = String>) -> Self {
        self.expansions = expansions
            .into_iter()
            .map(|e| text::normalize(&e))
            .filter(|e| !e.is_empty() && *e != self.normalized)
            .collect();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.trigram_threshold = threshold;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn substring_hit(product: &Product, needle: &str) -> bool {
        text::contains_normalized(&product.name, needle)
            || text::contains_normalized(&product.description, needle)
            || text::contains_normalized(&product.sku, needle)
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.is_empty() {
            return true;
        }
        if product.search_document().matches_all(&self.tokens) {
            return true;
        }
        if Self::substring_hit(product, &self.normalized) {
            return true;
        }
        if text::trigram_similarity(&self.normalized, &product.name) >= self.trigram_threshold
            || text::trigram_similarity(&self.normalized, &product.sku) >= self.trigram_threshold
        {
            return true;
        }
        self.expansions
            .iter()
            .any(|expansion| Self::substring_hit(product, expansion))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Structured constraints
// ═══════════════════════════════════════════════════════════════════════════

/// Inclusive effective-price range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Lower bound inclusive, upper bound exclusive (bucket semantics)
    pub fn half_open(min: Option<f64>, max: Option<f64>) -> HalfOpen {
        HalfOpen { min, max }
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }
}

/// `[min, max)` range used by price buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HalfOpen {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl HalfOpen {
    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price < max)
    }
}

/// Inclusive created-at range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.after.map_or(true, |a| ts >= a) && self.before.map_or(true, |b| ts <= b)
    }
}

/// At least one of `term_ids` for `attribute_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeConstraint {
    pub attribute_id: AttributeId,
    pub term_ids: BTreeSet<TermId>,
}

impl AttributeConstraint {
    pub fn new(attribute_id: AttributeId, term_ids: impl IntoIterator<Item = TermId>) -> Self {
        Self {
            attribute_id,
            term_ids: term_ids.into_iter().collect(),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        product
            .attribute_values
            .iter()
            .any(|av| av.attribute_id == self.attribute_id && self.term_ids.contains(&av.term_id))
    }
}

/// Resolved product predicate
///
/// Every present field is a conjunct. `None` means "no constraint".
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub text: Option<TextQuery>,
    /// Already expanded through the category tree
    pub category_ids: Option<BTreeSet<CategoryId>>,
    pub brand_ids: Option<BTreeSet<BrandId>>,
    pub price: Option<PriceRange>,
    /// Half-open bucket range, applied in addition to `price`
    pub price_bucket: Option<HalfOpen>,
    /// Every listed tag must be present
    pub tags: Option<BTreeSet<TagId>>,
    pub attributes: Vec<AttributeConstraint>,
    pub in_stock: Option<bool>,
    pub on_sale: Option<bool>,
    pub featured: Option<bool>,
    pub created: Option<DateRange>,
    pub statuses: Option<BTreeSet<ProductStatus>>,
    pub exclude_ids: BTreeSet<ProductId>,
    /// Instant sale windows and effective prices are evaluated at
    pub now: DateTime<Utc>,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            text: None,
            category_ids: None,
            brand_ids: None,
            price: None,
            price_bucket: None,
            tags: None,
            attributes: Vec::new(),
            in_stock: None,
            on_sale: None,
            featured: None,
            created: None,
            statuses: None,
            exclude_ids: BTreeSet::new(),
            now: Utc::now(),
        }
    }
}

impl ProductFilter {
    /// Only active products
    pub fn active() -> Self {
        Self {
            statuses: Some([ProductStatus::Active].into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_categories(mut self, ids: impl IntoIterator<Item = CategoryId>) -> Self {
        self.category_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_brands(mut self, ids: impl IntoIterator<Item = BrandId>) -> Self {
        self.brand_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_text(mut self, text: TextQuery) -> Self {
        self.text = Some(text);
        self
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = ProductId>) -> Self {
        self.exclude_ids.extend(ids);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.exclude_ids.contains(&product.id) {
            return false;
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&product.status) {
                return false;
            }
        }
        if let Some(ids) = &self.category_ids {
            if !ids.contains(&product.category_id) {
                return false;
            }
        }
        if let Some(ids) = &self.brand_ids {
            match product.brand_id {
                Some(brand) if ids.contains(&brand) => {}
                _ => return false,
            }
        }
        if self.price.is_some() || self.price_bucket.is_some() {
            let price = product.effective_price(self.now);
            if !self.price.map_or(true, |r| r.contains(price)) {
                return false;
            }
            if !self.price_bucket.map_or(true, |b| b.contains(price)) {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().all(|t| product.tags.contains(t)) {
                return false;
            }
        }
        if !self.attributes.iter().all(|c| c.matches(product)) {
            return false;
        }
        if let Some(want) = self.in_stock {
            if product.is_in_stock() != want {
                return false;
            }
        }
        if let Some(want) = self.on_sale {
            if product.is_on_sale(self.now) != want {
                return false;
            }
        }
        if let Some(want) = self.featured {
            if product.featured != want {
                return false;
            }
        }
        if let Some(range) = &self.created {
            if !range.contains(product.created_at) {
                return false;
            }
        }
        // Text last: the most expensive check
        self.text.as_ref().map_or(true, |t| t.matches(product))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Sort & paging
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Relevance,
    Price,
    Name,
    #[default]
    CreatedAt,
    Popularity,
    Rating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Single-key sort with explicit direction; ties fall back to id asc
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Order two products; `Relevance` has no store-side meaning and
    /// sorts like the default (`created_at desc`)
    pub fn compare(&self, a: &Product, b: &Product, now: DateTime<Utc>) -> Ordering {
        let (key, order) = match self.field {
            SortField::Relevance => (
                b.created_at.cmp(&a.created_at),
                SortOrder::Asc,
            ),
            SortField::Price => (
                a.effective_price(now)
                    .partial_cmp(&b.effective_price(now))
                    .unwrap_or(Ordering::Equal),
                self.order,
            ),
            SortField::Name => (
                a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                self.order,
            ),
            SortField::CreatedAt => (a.created_at.cmp(&b.created_at), self.order),
            SortField::Popularity => (a.popularity.cmp(&b.popularity), self.order),
            SortField::Rating => (
                a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal),
                self.order,
            ),
        };
        let key = match order {
            SortOrder::Asc => key,
            SortOrder::Desc => key.reverse(),
        };
        key.then_with(|| a.id.cmp(&b.id))
    }
}

/// Offset/limit window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Every match
    pub fn unbounded() -> Self {
        Self {
            offset: 0,
            limit: usize::MAX,
        }
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Grouping
// ═══════════════════════════════════════════════════════════════════════════

/// Dimension a `count_by_group` call buckets matches by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Direct category (no rollup)
    Category,
    Brand,
    Tag,
    /// Terms of one attribute
    Term(AttributeId),
    Stock { low_stock_threshold: u32 },
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupValue {
    Category(CategoryId),
    Brand(BrandId),
    Tag(TagId),
    Term(TermId),
    Stock(StockState),
    Status(ProductStatus),
}

impl GroupKey {
    /// Group values one product contributes to (a product with three tags
    /// counts once under each)
    pub fn values_of(&self, product: &Product) -> Vec<GroupValue> {
        match self {
            GroupKey::Category => vec![GroupValue::Category(product.category_id)],
            GroupKey::Brand => product.brand_id.map(GroupValue::Brand).into_iter().collect(),
            GroupKey::Tag => {
                let unique: BTreeSet<TagId> = product.tags.iter().copied().collect();
                unique.into_iter().map(GroupValue::Tag).collect()
            }
            GroupKey::Term(attribute_id) => {
                let unique: BTreeSet<TermId> = product
                    .attribute_values
                    .iter()
                    .filter(|av| av.attribute_id == *attribute_id)
                    .map(|av| av.term_id)
                    .collect();
                unique.into_iter().map(GroupValue::Term).collect()
            }
            GroupKey::Stock {
                low_stock_threshold,
            } => vec![GroupValue::Stock(product.stock_state(*low_stock_threshold))],
            GroupKey::Status => vec![GroupValue::Status(product.status)],
        }
    }
}
