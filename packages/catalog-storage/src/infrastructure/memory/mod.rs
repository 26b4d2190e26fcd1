//! In-memory adapters
//!
//! - [`InMemoryProductStore`]: copy-on-write product table with cheap snapshots
//! - [`InMemoryCategoryStore`], [`InMemoryTaxonomyStore`]: taxonomy tables
//! - [`InMemoryInteractionLog`], [`InMemoryOrderHistory`]: behaviour logs
//! - [`InMemoryRecommendationCache`]: derived recommendation rows
//! - [`InMemorySuggestionStore`]: suggestion entries with atomic counters
//! - [`InMemoryAnalyticsRecorder`], [`InMemoryPreferenceStore`], [`InMemoryFilterSetStore`]

mod cache;
mod categories;
mod filter_sets;
mod interactions;
mod products;
mod suggestions;

pub use cache::InMemoryRecommendationCache;
pub use categories::{InMemoryCategoryStore, InMemoryTaxonomyStore};
pub use filter_sets::InMemoryFilterSetStore;
pub use interactions::{InMemoryInteractionLog, InMemoryOrderHistory};
pub use products::{InMemoryProductStore, ProductFaults};
pub use suggestions::{InMemoryAnalyticsRecorder, InMemoryPreferenceStore, InMemorySuggestionStore};
