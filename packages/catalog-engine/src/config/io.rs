//! Configuration I/O schema
//!
//! Loading and export live on [`EngineConfig`](super::EngineConfig).

use serde::{Deserialize, Serialize};

use super::section_configs::*;

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    pub preset: String,

    /// Section overrides; a present section replaces the preset's section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ConfigOverrides>,
}

/// Configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<FacetConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendationConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<AutocompleteConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryConfig>,
}
