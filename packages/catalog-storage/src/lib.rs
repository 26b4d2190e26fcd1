//! catalog-storage - data model and store ports for the catalog engine
//!
//! > "Describe the catalog once, read it through narrow ports."
//!
//! ## Core Principles
//!
//! 1. **Ports, not engines**: every collaborator the engine reads from is an
//!    `async_trait` port in [`domain::ports`]; no storage engine is prescribed.
//! 2. **Consistent reads**: [`ProductStore::snapshot`] hands out an immutable
//!    read view that one request uses for its whole fan-out.
//! 3. **Append-only behaviour**: interactions are never updated, only
//!    appended and pruned.
//!
//! ## Layout
//!
//! - `domain/models.rs`  - entities (Product, Category, Interaction, cache rows, ...)
//! - `domain/filter.rs`  - `ProductFilter`, sort, paging and grouping value types
//! - `domain/ports.rs`   - store traits
//! - `text.rs`           - normalization, trigram similarity, full-text rank
//! - `infrastructure/`   - in-memory adapters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catalog_storage::{InMemoryProductStore, ProductFilter, ProductStore, SortSpec, Page};
//!
//! let store = InMemoryProductStore::new();
//! store.upsert_product(product).await?;
//!
//! let snapshot = store.snapshot().await?;
//! let (page, total) = snapshot
//!     .find_by_predicate(&ProductFilter::default(), &SortSpec::default(), Page::first(20))
//!     .await?;
//! ```

pub mod domain;
pub mod error;
pub mod text;

#[cfg(feature = "memory")]
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::filter::{
    AttributeConstraint, DateRange, GroupKey, GroupValue, HalfOpen, Page, PriceRange, ProductFilter,
    SortField, SortOrder, SortSpec, TextQuery,
};
pub use domain::models::{
    Attribute, AttributeId, AttributeValue, Brand, BrandId, Category, CategoryId, FilterSet,
    FrequentlyBoughtTogetherRow, HistoryEntry, Interaction, InteractionKind, Order, Product,
    ProductId, ProductRecommendationRow, ProductStatus, QueryPopularity, SearchEvent, Shopper,
    SimilarityRow, StockState, SuggestionEntry, SuggestionKind, Tag, TagId, Term, TermId,
    TrendingPeriod, TrendingRow, UserId,
};
pub use domain::ports::{
    AnalyticsRecorder, CategoryStore, FilterSetStore, InteractionLogStore, OrderHistoryStore,
    PreferenceStore, ProductSnapshot, ProductStore, RecommendationCacheStore, SuggestionStore,
    TaxonomyStore,
};

#[cfg(feature = "memory")]
pub use infrastructure::memory::{
    InMemoryAnalyticsRecorder, InMemoryCategoryStore, InMemoryFilterSetStore,
    InMemoryInteractionLog, InMemoryOrderHistory, InMemoryPreferenceStore, InMemoryProductStore,
    InMemoryRecommendationCache, InMemorySuggestionStore, InMemoryTaxonomyStore, ProductFaults,
};
