//! Engine configuration
//!
//! Three levels:
//! - Preset: one-liner (`EngineConfig::preset(Preset::Fast)`)
//! - Section override: builder closures per component
//! - YAML: complete control (`EngineConfig::from_yaml("catalog.yaml")`)
//!
//! ```rust,ignore
//! use catalog_engine::config::{EngineConfig, Preset};
//!
//! let config = EngineConfig::preset(Preset::Balanced)
//!     .search(|s| s.request_timeout_ms(500))
//!     .build()?;
//! ```

pub mod engine_config;
pub mod error;
pub mod io;
pub mod preset;
pub mod section_configs;
pub mod validation;

pub use engine_config::{EngineConfig, ValidatedConfig};
pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigExportV1, ConfigOverrides};
pub use preset::Preset;
pub use section_configs::{
    AutocompleteConfig, CategoryConfig, FacetConfig, InteractionWeights, PriceBucket,
    RecommendationConfig, RelevanceWeights, SearchConfig, SuggestionWeights, TrendingStaleness,
};
pub use validation::{Validatable, ValidatableCollection};
