//! Engine-wide configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigExportV1, ConfigOverrides};
use super::preset::Preset;
use super::section_configs::*;
use super::validation::Validatable;

/// Supported YAML schema versions
const SUPPORTED_VERSIONS: [u32; 1] = [1];

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    preset: Preset,
    pub search: SearchConfig,
    pub facets: FacetConfig,
    pub recommendation: RecommendationConfig,
    pub autocomplete: AutocompleteConfig,
    pub category: CategoryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

impl EngineConfig {
    /// Complete defaults for `preset`
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            search: SearchConfig::from_preset(preset),
            facets: FacetConfig::from_preset(preset),
            recommendation: RecommendationConfig::from_preset(preset),
            autocomplete: AutocompleteConfig::from_preset(preset),
            category: CategoryConfig::from_preset(preset),
        }
    }

    pub fn get_preset(&self) -> Preset {
        self.preset
    }

    /// Override the search section
    pub fn search(mut self, f: impl FnOnce(SearchConfig) -> SearchConfig) -> Self {
        self.search = f(self.search);
        self
    }

    /// Override the facets section
    pub fn facets(mut self, f: impl FnOnce(FacetConfig) -> FacetConfig) -> Self {
        self.facets = f(self.facets);
        self
    }

    /// Override the recommendation section
    pub fn recommendation(
        mut self,
        f: impl FnOnce(RecommendationConfig) -> RecommendationConfig,
    ) -> Self {
        self.recommendation = f(self.recommendation);
        self
    }

    /// Override the autocomplete section
    pub fn autocomplete(mut self, f: impl FnOnce(AutocompleteConfig) -> AutocompleteConfig) -> Self {
        self.autocomplete = f(self.autocomplete);
        self
    }

    /// Override the category section
    pub fn category(mut self, f: impl FnOnce(CategoryConfig) -> CategoryConfig) -> Self {
        self.category = f(self.category);
        self
    }

    /// Validate every section
    pub fn build(self) -> ConfigResult<ValidatedConfig> {
        self.validate()?;
        Ok(ValidatedConfig(self))
    }

    /// Load from a YAML v1 file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<ValidatedConfig> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Load from YAML v1 text
    pub fn from_yaml_str(content: &str) -> ConfigResult<ValidatedConfig> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        if !SUPPORTED_VERSIONS.contains(&export.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::parse(&export.preset)?;
        let mut config = Self::preset(preset);

        if let Some(overrides) = export.overrides {
            if let Some(search) = overrides.search {
                config.search = search;
            }
            if let Some(facets) = overrides.facets {
                config.facets = facets;
            }
            if let Some(recommendation) = overrides.recommendation {
                config.recommendation = recommendation;
            }
            if let Some(autocomplete) = overrides.autocomplete {
                config.autocomplete = autocomplete;
            }
            if let Some(category) = overrides.category {
                config.category = category;
            }
        }

        config.build()
    }

    /// Export as YAML v1
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: 1,
            preset: self.preset.to_string(),
            overrides: Some(ConfigOverrides {
                search: Some(self.search.clone()),
                facets: Some(self.facets.clone()),
                recommendation: Some(self.recommendation.clone()),
                autocomplete: Some(self.autocomplete.clone()),
                category: Some(self.category.clone()),
            }),
        };
        Ok(serde_yaml::to_string(&export)?)
    }

    /// One-line summary for startup logs
    pub fn describe(&self) -> String {
        format!(
            "preset={} timeout={}ms max_limit={} price_buckets={} synonyms={}",
            self.preset,
            self.search.request_timeout_ms,
            self.search.max_limit,
            self.facets.price_buckets.len(),
            self.search.synonyms.len()
        )
    }
}

impl Validatable for EngineConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.search.validate()?;
        self.facets.validate()?;
        self.recommendation.validate()?;
        self.autocomplete.validate()?;
        self.category.validate()
    }

    fn config_name(&self) -> &'static str {
        "EngineConfig"
    }
}

/// Configuration that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig(EngineConfig);

impl ValidatedConfig {
    pub fn into_inner(self) -> EngineConfig {
        self.0
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        self.0.to_yaml()
    }
}

impl std::ops::Deref for ValidatedConfig {
    type Target = EngineConfig;

    fn deref(&self) -> &EngineConfig {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preset_builds() {
        for preset in Preset::ALL {
            let config = EngineConfig::preset(preset).build().unwrap();
            assert_eq!(config.get_preset(), preset);
        }
    }

    #[test]
    fn test_fast_preset_is_tighter() {
        let fast = EngineConfig::preset(Preset::Fast);
        let thorough = EngineConfig::preset(Preset::Thorough);
        assert!(fast.search.request_timeout_ms < thorough.search.request_timeout_ms);
        assert!(fast.autocomplete.source_limit < thorough.autocomplete.source_limit);
    }

    #[test]
    fn test_section_override() {
        let config = EngineConfig::preset(Preset::Balanced)
            .search(|s| s.request_timeout_ms(500))
            .build()
            .unwrap();
        assert_eq!(config.search.request_timeout_ms, 500);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let result = EngineConfig::preset(Preset::Balanced)
            .search(|s| s.request_timeout_ms(0))
            .build();
        assert!(matches!(result, Err(ConfigError::Range { .. })));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = EngineConfig::preset(Preset::Fast)
            .search(|s| s.synonyms(vec![vec!["laptop".into(), "notebook".into()]]));
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("preset: fast"));

        let loaded = EngineConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(loaded.into_inner(), config);
    }

    #[test]
    fn test_yaml_partial_section() {
        let yaml = r#"
version: 1
preset: thorough
overrides:
  search:
    max_limit: 200
    synonyms:
      - [tv, television]
"#;
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.search.max_limit, 200);
        assert_eq!(config.search.synonyms.len(), 1);
        // Section defaults come from `Default`, not the named preset
        assert_eq!(config.search.default_limit, 20);
        assert_eq!(config.get_preset(), Preset::Thorough);
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = EngineConfig::from_yaml_str("version: 2\npreset: fast\n");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_yaml_missing_version() {
        assert!(matches!(
            EngineConfig::from_yaml_str("preset: fast\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_yaml_unknown_preset() {
        assert!(matches!(
            EngineConfig::from_yaml_str("version: 1\npreset: turbo\n"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_yaml_file_missing() {
        assert!(matches!(
            EngineConfig::from_yaml("/nonexistent/catalog.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
