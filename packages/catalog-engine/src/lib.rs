//! catalog-engine - search, faceting, recommendations and autocomplete
//!
//! ## Components
//!
//! - [`features::category`]: category tree snapshots, descendant expansion, rollups
//! - [`features::search`]: validated requests, weighted relevance ranking,
//!   synonym expansion, saved filter sets
//! - [`features::facets`]: per-dimension counts with that dimension's own
//!   constraint lifted, fanned out under the request deadline
//! - [`features::recommendation`]: related, similar, bought-together, trending
//!   and personalized lists with cache-then-live reads plus batch jobs
//! - [`features::autocomplete`]: six suggestion sources merged into one ranked list
//!
//! [`CatalogEngine`] wires one of each from an [`config::EngineConfig`] and a
//! [`CatalogStores`] bundle.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catalog_engine::{CatalogEngine, CatalogStores};
//! use catalog_engine::config::{EngineConfig, Preset};
//! use catalog_engine::features::search::SearchRequest;
//!
//! let config = EngineConfig::preset(Preset::Balanced).build()?;
//! let engine = CatalogEngine::new(config, stores, &prometheus::Registry::new())?;
//!
//! let response = engine
//!     .search(&SearchRequest::new().query("wireless headphones").with_facets())
//!     .await?;
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod features;
pub mod metrics;

pub use engine::{CatalogEngine, CatalogStores};
pub use errors::{CatalogError, Result};
pub use metrics::EngineMetrics;

pub use features::autocomplete::{AutocompleteRequest, AutocompleteResponse, Timeframe};
pub use features::facets::{FacetOutcome, FacetSet, FacetValue};
pub use features::recommendation::{Recommendations, Source, Strategy};
pub use features::search::{SearchRequest, SearchResponse};
