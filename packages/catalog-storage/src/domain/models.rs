//! Catalog domain models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::text::SearchDocument;

pub type ProductId = u64;
pub type CategoryId = u64;
pub type BrandId = u64;
pub type TagId = u64;
pub type AttributeId = u64;
pub type TermId = u64;
pub type UserId = u64;

// ═══════════════════════════════════════════════════════════════════════════
// Catalog
// ═══════════════════════════════════════════════════════════════════════════

/// Publication status of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Draft,
    Archived,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 3] = [
        ProductStatus::Active,
        ProductStatus::Draft,
        ProductStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Draft => "draft",
            ProductStatus::Archived => "archived",
        }
    }
}

/// Stock state, always derived from the stock level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    InStock,
    LowStock,
    OutOfStock,
}

/// (attribute, term) pair attached to a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeValue {
    pub attribute_id: AttributeId,
    pub term_id: TermId,
}

/// Sellable product
///
/// `sale_price` only applies while it is positive and `now` falls inside the
/// optional `[sale_start, sale_end]` window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub sale_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sale_end: Option<DateTime<Utc>>,
    pub stock: u32,
    pub status: ProductStatus,
    pub category_id: CategoryId,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub attribute_values: Vec<AttributeValue>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub popularity: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    indexed: IndexedDocument,
}

/// Tokenized text filled in by [`Product::reindex`], shared by clones
///
/// Never part of equality; it is derived from the text fields.
#[derive(Clone, Default)]
struct IndexedDocument(Option<Arc<SearchDocument>>);

impl PartialEq for IndexedDocument {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl std::fmt::Debug for IndexedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.0.is_some() { "indexed" } else { "unindexed" })
    }
}

impl Product {
    /// Create an active, in-stock product with the given basics
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        sku: impl Into<String>,
        price: f64,
        category_id: CategoryId,
    ) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id,
            slug: crate::text::tokenize(&name).join("-"),
            name,
            sku: sku.into(),
            description: String::new(),
            short_description: String::new(),
            keywords: Vec::new(),
            price,
            sale_price: None,
            sale_start: None,
            sale_end: None,
            stock: 10,
            status: ProductStatus::Active,
            category_id,
            brand_id: None,
            tags: Vec::new(),
            attribute_values: Vec::new(),
            featured: false,
            rating: 0.0,
            popularity: 0,
            created_at: now,
            updated_at: now,
            indexed: IndexedDocument::default(),
        }
    }

    pub fn with_brand(mut self, brand_id: BrandId) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self.indexed = IndexedDocument::default();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagId>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_attribute(mut self, attribute_id: AttributeId, term_id: TermId) -> Self {
        self.attribute_values.push(AttributeValue {
            attribute_id,
            term_id,
        });
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_sale(
        mut self,
        sale_price: f64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.sale_price = Some(sale_price);
        self.sale_start = start;
        self.sale_end = end;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    pub fn featured(mut self) -> Self {
        self.featured = true;
        self
    }

    /// Sale price is set, positive and `now` is inside the sale window
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        match self.sale_price {
            Some(price) if price > 0.0 => {
                self.sale_start.map_or(true, |start| start <= now)
                    && self.sale_end.map_or(true, |end| now <= end)
            }
            _ => false,
        }
    }

    /// Price the shopper pays at `now`
    pub fn effective_price(&self, now: DateTime<Utc>) -> f64 {
        if self.is_on_sale(now) {
            self.sale_price.unwrap_or(self.price)
        } else {
            self.price
        }
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn stock_state(&self, low_stock_threshold: u32) -> StockState {
        if self.stock == 0 {
            StockState::OutOfStock
        } else if self.stock <= low_stock_threshold {
            StockState::LowStock
        } else {
            StockState::InStock
        }
    }

    pub fn has_term(&self, attribute_id: AttributeId, term_id: TermId) -> bool {
        self.attribute_values
            .iter()
            .any(|av| av.attribute_id == attribute_id && av.term_id == term_id)
    }

    /// Name + description + short description + sku + keywords
    ///
    /// Served from the index built by [`Product::reindex`] when present,
    /// tokenized on the spot otherwise.
    pub fn search_document(&self) -> Arc<SearchDocument> {
        match &self.indexed.0 {
            Some(document) => Arc::clone(document),
            None => Arc::new(self.tokenize_document()),
        }
    }

    /// Rebuild the stored search document; call after editing text fields
    pub fn reindex(&mut self) {
        self.indexed = IndexedDocument(Some(Arc::new(self.tokenize_document())));
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed.0.is_some()
    }

    fn tokenize_document(&self) -> SearchDocument {
        SearchDocument::new(
            &self.name,
            [
                self.description.as_str(),
                self.short_description.as_str(),
                self.sku.as_str(),
            ]
            .into_iter()
            .chain(self.keywords.iter().map(String::as_str)),
        )
    }
}

/// Node of the category forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>, parent_id: Option<CategoryId>) -> Self {
        let name = name.into();
        Self {
            id,
            slug: crate::text::tokenize(&name).join("-"),
            name,
            parent_id,
            is_active: true,
            sort_order: 0,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
}

impl Brand {
    pub fn new(id: BrandId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            slug: crate::text::tokenize(&name).join("-"),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            slug: crate::text::tokenize(&name).join("-"),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub name: String,
    pub slug: String,
}

/// Attribute (e.g. "Color") with its terms ("Red", "Blue")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    pub slug: String,
    pub terms: Vec<Term>,
}

impl Attribute {
    pub fn new(id: AttributeId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            slug: crate::text::tokenize(&name).join("-"),
            name,
            terms: Vec::new(),
        }
    }

    pub fn with_term(mut self, id: TermId, name: impl Into<String>) -> Self {
        let name = name.into();
        self.terms.push(Term {
            id,
            slug: crate::text::tokenize(&name).join("-"),
            name,
        });
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Behaviour
// ═══════════════════════════════════════════════════════════════════════════

/// Who is asking: an authenticated user or an anonymous session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shopper {
    User(UserId),
    Session(String),
}

impl Shopper {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Shopper::User(id) => Some(*id),
            Shopper::Session(_) => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Shopper::User(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Cart,
    Wishlist,
    Purchase,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Cart => "cart",
            InteractionKind::Wishlist => "wishlist",
            InteractionKind::Purchase => "purchase",
        }
    }
}

/// One shopper action on one product (append-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: Option<UserId>,
    pub session_id: Option<String>,
    pub product_id: ProductId,
    pub kind: InteractionKind,
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn new(shopper: &Shopper, product_id: ProductId, kind: InteractionKind, weight: f64) -> Self {
        let (user_id, session_id) = match shopper {
            Shopper::User(id) => (Some(*id), None),
            Shopper::Session(s) => (None, Some(s.clone())),
        };
        Self {
            id: Uuid::new_v4(),
            user_id,
            session_id,
            product_id,
            kind,
            weight,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn belongs_to(&self, shopper: &Shopper) -> bool {
        match shopper {
            Shopper::User(id) => self.user_id == Some(*id),
            Shopper::Session(s) => self.session_id.as_deref() == Some(s.as_str()),
        }
    }
}

/// Completed order (read-only input)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub user_id: Option<UserId>,
    pub product_ids: Vec<ProductId>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(id: u64, product_ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            id,
            user_id: None,
            product_ids: product_ids.into_iter().collect(),
            created_at: Utc::now(),
        }
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.product_ids.contains(&product_id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Derived rows (rebuilt by batch jobs)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRow {
    pub product_id: ProductId,
    pub similar_id: ProductId,
    pub score: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentlyBoughtTogetherRow {
    pub product_id: ProductId,
    pub related_id: ProductId,
    pub frequency: u32,
    pub updated_at: DateTime<Utc>,
}

/// Trending aggregation period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendingPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl TrendingPeriod {
    pub const ALL: [TrendingPeriod; 3] = [
        TrendingPeriod::Daily,
        TrendingPeriod::Weekly,
        TrendingPeriod::Monthly,
    ];

    /// Interaction window the trend score sums over
    pub fn lookback(&self) -> Duration {
        match self {
            TrendingPeriod::Daily => Duration::days(1),
            TrendingPeriod::Weekly => Duration::days(7),
            TrendingPeriod::Monthly => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingPeriod::Daily => "daily",
            TrendingPeriod::Weekly => "weekly",
            TrendingPeriod::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingRow {
    pub product_id: ProductId,
    pub period: TrendingPeriod,
    pub score: f64,
    pub updated_at: DateTime<Utc>,
}

/// Precomputed per-user recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecommendationRow {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub score: f64,
    pub updated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Suggestions & analytics
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Product,
    Category,
    Brand,
    Query,
}

impl SuggestionKind {
    pub const ALL: [SuggestionKind; 4] = [
        SuggestionKind::Product,
        SuggestionKind::Category,
        SuggestionKind::Brand,
        SuggestionKind::Query,
    ];
}

/// Autocomplete entry with aggregate counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionEntry {
    pub kind: SuggestionKind,
    pub value: String,
    pub display: String,
    pub search_count: u64,
    pub click_count: u64,
    pub priority: i32,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub is_trending: bool,
    #[serde(default)]
    pub is_personalized: bool,
    pub updated_at: DateTime<Utc>,
}

impl SuggestionEntry {
    pub fn new(kind: SuggestionKind, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            kind,
            display: value.clone(),
            value,
            search_count: 0,
            click_count: 0,
            priority: 0,
            synonyms: Vec::new(),
            is_trending: false,
            is_personalized: false,
            updated_at: Utc::now(),
        }
    }

    pub fn with_counts(mut self, search_count: u64, click_count: u64) -> Self {
        self.search_count = search_count;
        self.click_count = click_count;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_synonyms(mut self, synonyms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn trending(mut self) -> Self {
        self.is_trending = true;
        self
    }

    pub fn updated(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }
}

/// One executed search, as recorded by analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEvent {
    pub query: String,
    pub shopper: Option<Shopper>,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl SearchEvent {
    pub fn new(query: impl Into<String>, shopper: Option<Shopper>, result_count: usize) -> Self {
        Self {
            query: query.into(),
            shopper,
            result_count,
            timestamp: Utc::now(),
        }
    }
}

/// Aggregated query popularity over a timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPopularity {
    pub query: String,
    pub count: u64,
    pub last_searched: DateTime<Utc>,
}

/// A past query of one shopper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub searched_at: DateTime<Utc>,
}

/// User-saved filter preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub id: Uuid,
    pub owner: Shopper,
    pub name: String,
    pub filters: serde_json::Value,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

impl FilterSet {
    pub fn new(owner: Shopper, name: impl Into<String>, filters: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            name: name.into(),
            filters,
            usage_count: 0,
            created_at: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
