//! Domain layer for the catalog stores
//!
//! # Domain Models
//!
//! - `Product`, `Category`, `Brand`, `Tag`, `Attribute`/`Term`: administratively mutated catalog
//! - `Interaction`, `Order`: append-only behaviour, source of truth for scoring
//! - `SimilarityRow`, `FrequentlyBoughtTogetherRow`, `TrendingRow`,
//!   `ProductRecommendationRow`: derived rows rebuilt by batch jobs
//! - `SuggestionEntry`, `FilterSet`: mutable aggregates
//!
//! # Port Traits
//!
//! - `ProductStore` / `ProductSnapshot`: consistent-read product queries
//! - `CategoryStore`, `TaxonomyStore`: taxonomy lookups
//! - `InteractionLogStore`, `OrderHistoryStore`: behavioural logs
//! - `RecommendationCacheStore`, `SuggestionStore`, `AnalyticsRecorder`,
//!   `PreferenceStore`, `FilterSetStore`: keyed reads/upserts, no business logic

pub mod filter;
pub mod models;
pub mod ports;

pub use filter::*;
pub use models::*;
pub use ports::*;
