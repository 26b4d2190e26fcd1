//! Per-component configuration sections
//!
//! Each component has its own section with preset defaults and range checks.

use catalog_storage::{InteractionKind, ProductStatus, TrendingPeriod};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{check_range, ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::{Validatable, ValidatableCollection};

// ============================================================================
// Search
// ============================================================================

/// Relevance rule table: each signal's weight in the summed score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceWeights {
    /// Full-text rank of the query against the search document (rank in 0..=1)
    pub full_text: f64,
    /// Query is a substring of the name
    pub name_substring: f64,
    /// Query is a substring of the sku
    pub sku_substring: f64,
    /// Trigram similarity between query and name (similarity in 0..=1)
    pub trigram_name: f64,
    pub featured: f64,
    pub in_stock: f64,
    /// Created within `SearchConfig::new_arrival_days`
    pub new_arrival: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            full_text: 4.0,
            name_substring: 3.0,
            sku_substring: 2.0,
            trigram_name: 2.0,
            featured: 1.5,
            in_stock: 1.0,
            new_arrival: 0.5,
        }
    }
}

impl Validatable for RelevanceWeights {
    fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("search.weights.full_text", self.full_text),
            ("search.weights.name_substring", self.name_substring),
            ("search.weights.sku_substring", self.sku_substring),
            ("search.weights.trigram_name", self.trigram_name),
            ("search.weights.featured", self.featured),
            ("search.weights.in_stock", self.in_stock),
            ("search.weights.new_arrival", self.new_arrival),
        ] {
            check_range(field, value, 0.0, 100.0, "Signal weights must be non-negative")?;
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "RelevanceWeights"
    }
}

/// SearchQueryEngine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Page size when the request omits one
    pub default_limit: usize,
    /// Largest accepted page size (1..=1000)
    pub max_limit: usize,
    /// Request deadline for the ranked query and facet fan-out
    pub request_timeout_ms: u64,
    /// Minimum trigram similarity for a fuzzy match (0.0..=1.0)
    pub trigram_threshold: f64,
    /// Window for the new-arrival boost
    pub new_arrival_days: i64,
    /// `stock <= low_stock_threshold` reads as low stock
    pub low_stock_threshold: u32,
    /// Statuses searched when the request names none
    pub default_statuses: Vec<ProductStatus>,
    /// Groups of interchangeable query terms
    pub synonyms: Vec<Vec<String>>,
    /// Record a search event for non-empty queries
    pub record_analytics: bool,
    pub weights: RelevanceWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

impl SearchConfig {
    pub fn from_preset(preset: Preset) -> Self {
        let (max_limit, request_timeout_ms) = match preset {
            Preset::Fast => (50, 250),
            Preset::Balanced => (100, 1_000),
            Preset::Thorough => (500, 5_000),
        };
        Self {
            default_limit: 20,
            max_limit,
            request_timeout_ms,
            trigram_threshold: catalog_storage::text::DEFAULT_TRIGRAM_THRESHOLD,
            new_arrival_days: 30,
            low_stock_threshold: 5,
            default_statuses: vec![ProductStatus::Active],
            synonyms: Vec::new(),
            record_analytics: true,
            weights: RelevanceWeights::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn new_arrival_window(&self) -> ChronoDuration {
        ChronoDuration::days(self.new_arrival_days)
    }

    /// Builder: Set synonym groups
    pub fn synonyms(mut self, groups: Vec<Vec<String>>) -> Self {
        self.synonyms = groups;
        self
    }

    /// Builder: Set request_timeout_ms
    pub fn request_timeout_ms(mut self, v: u64) -> Self {
        self.request_timeout_ms = v;
        self
    }
}

impl Validatable for SearchConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "search.max_limit",
            self.max_limit,
            1,
            1000,
            "Page size cap must be positive and bounded",
        )?;
        check_range(
            "search.default_limit",
            self.default_limit,
            1,
            self.max_limit,
            "Default page size must not exceed max_limit",
        )?;
        check_range(
            "search.request_timeout_ms",
            self.request_timeout_ms,
            1,
            60_000,
            "Request deadline must be between 1ms and 60s",
        )?;
        check_range(
            "search.trigram_threshold",
            self.trigram_threshold,
            0.0,
            1.0,
            "Trigram similarity is a ratio",
        )?;
        check_range(
            "search.new_arrival_days",
            self.new_arrival_days,
            0,
            3650,
            "New-arrival window is measured in days",
        )?;
        if self.default_statuses.is_empty() {
            return Err(ConfigError::Custom(
                "search.default_statuses must name at least one status".to_string(),
            ));
        }
        if let Some(group) = self.synonyms.iter().find(|g| g.len() < 2) {
            return Err(ConfigError::Custom(format!(
                "search.synonyms group {:?} needs at least two terms",
                group
            )));
        }
        self.weights.validate()
    }

    fn config_name(&self) -> &'static str {
        "SearchConfig"
    }
}

// ============================================================================
// Facets
// ============================================================================

/// One price bucket, `[min, max)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub label: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceBucket {
    pub fn new(label: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            label: label.into(),
            min,
            max,
        }
    }
}

impl Validatable for PriceBucket {
    fn validate(&self) -> ConfigResult<()> {
        if self.min.map_or(false, |m| m < 0.0) || self.max.map_or(false, |m| m < 0.0) {
            return Err(ConfigError::Custom(format!(
                "price bucket '{}' has a negative bound",
                self.label
            )));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min >= max {
                return Err(ConfigError::Custom(format!(
                    "price bucket '{}' is empty: {} >= {}",
                    self.label, min, max
                )));
            }
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "PriceBucket"
    }
}

fn default_price_buckets() -> Vec<PriceBucket> {
    vec![
        PriceBucket::new("Under $50", None, Some(50.0)),
        PriceBucket::new("$50 - $100", Some(50.0), Some(100.0)),
        PriceBucket::new("$100 - $200", Some(100.0), Some(200.0)),
        PriceBucket::new("$200 - $500", Some(200.0), Some(500.0)),
        PriceBucket::new("$500 - $1000", Some(500.0), Some(1000.0)),
        PriceBucket::new("$1000 and above", Some(1000.0), None),
    ]
}

/// FacetComputer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetConfig {
    pub price_buckets: Vec<PriceBucket>,
    /// Roll descendant counts into parent categories
    pub category_rollup: bool,
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            price_buckets: default_price_buckets(),
            category_rollup: true,
        }
    }
}

impl FacetConfig {
    pub fn from_preset(_preset: Preset) -> Self {
        Self::default()
    }
}

impl Validatable for FacetConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "facets.price_buckets",
            self.price_buckets.len(),
            1,
            32,
            "At least one price bucket is required",
        )?;
        self.price_buckets.validate_all()?;

        // Buckets must be disjoint; an open bound is only allowed at either end
        let mut ordered: Vec<&PriceBucket> = self.price_buckets.iter().collect();
        ordered.sort_by(|a, b| {
            a.min
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.min.unwrap_or(f64::NEG_INFINITY))
        });
        for pair in ordered.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let overlaps = match (prev.max, next.min) {
                (Some(end), Some(start)) => start < end,
                _ => true,
            };
            if overlaps {
                return Err(ConfigError::Custom(format!(
                    "price buckets '{}' and '{}' overlap",
                    prev.label, next.label
                )));
            }
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "FacetConfig"
    }
}

// ============================================================================
// Recommendation
// ============================================================================

/// Per-kind interaction multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionWeights {
    pub view: f64,
    pub cart: f64,
    pub wishlist: f64,
    pub purchase: f64,
}

impl Default for InteractionWeights {
    fn default() -> Self {
        Self {
            view: 1.0,
            cart: 3.0,
            wishlist: 4.0,
            purchase: 5.0,
        }
    }
}

impl InteractionWeights {
    pub fn weight(&self, kind: InteractionKind) -> f64 {
        match kind {
            InteractionKind::View => self.view,
            InteractionKind::Cart => self.cart,
            InteractionKind::Wishlist => self.wishlist,
            InteractionKind::Purchase => self.purchase,
        }
    }
}

/// How old the newest cached trending row may be before the period is recomputed live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendingStaleness {
    pub daily_minutes: i64,
    pub weekly_minutes: i64,
    pub monthly_minutes: i64,
}

impl Default for TrendingStaleness {
    fn default() -> Self {
        Self {
            daily_minutes: 60,
            weekly_minutes: 6 * 60,
            monthly_minutes: 24 * 60,
        }
    }
}

impl TrendingStaleness {
    pub fn max_staleness(&self, period: TrendingPeriod) -> ChronoDuration {
        ChronoDuration::minutes(match period {
            TrendingPeriod::Daily => self.daily_minutes,
            TrendingPeriod::Weekly => self.weekly_minutes,
            TrendingPeriod::Monthly => self.monthly_minutes,
        })
    }
}

/// RecommendationEngine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub interaction_weights: InteractionWeights,
    /// Minimum shared orders for a frequently-bought-together pair
    pub min_co_occurrence: u32,
    /// Similarity rows below this score are not stored
    pub min_similarity: f64,
    /// Rows kept per subject by the batch jobs
    pub similar_top_n: usize,
    pub bought_together_top_n: usize,
    pub personalized_top_n: usize,
    /// Interactions feeding affinity vectors
    pub affinity_lookback_days: i64,
    /// Interactions older than this are pruned
    pub interaction_retention_days: i64,
    pub trending_staleness: TrendingStaleness,
    /// Rayon threads for batch recomputation (0 = number of CPUs)
    pub batch_threads: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

impl RecommendationConfig {
    pub fn from_preset(preset: Preset) -> Self {
        let (similar_top_n, personalized_top_n) = match preset {
            Preset::Fast => (10, 20),
            Preset::Balanced => (20, 50),
            Preset::Thorough => (50, 200),
        };
        Self {
            default_limit: 10,
            max_limit: 50,
            interaction_weights: InteractionWeights::default(),
            min_co_occurrence: 2,
            min_similarity: 0.1,
            similar_top_n,
            bought_together_top_n: 10,
            personalized_top_n,
            affinity_lookback_days: 90,
            interaction_retention_days: 365,
            trending_staleness: TrendingStaleness::default(),
            batch_threads: 0,
        }
    }

    pub fn affinity_lookback(&self) -> ChronoDuration {
        ChronoDuration::days(self.affinity_lookback_days)
    }

    pub fn interaction_retention(&self) -> ChronoDuration {
        ChronoDuration::days(self.interaction_retention_days)
    }

    pub fn effective_batch_threads(&self) -> usize {
        if self.batch_threads == 0 {
            num_cpus::get()
        } else {
            self.batch_threads
        }
    }
}

impl Validatable for RecommendationConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "recommendation.max_limit",
            self.max_limit,
            1,
            1000,
            "Recommendation lists must be bounded",
        )?;
        check_range(
            "recommendation.default_limit",
            self.default_limit,
            1,
            self.max_limit,
            "Default limit must not exceed max_limit",
        )?;
        check_range(
            "recommendation.min_co_occurrence",
            self.min_co_occurrence,
            1,
            1000,
            "A pair needs at least one shared order",
        )?;
        check_range(
            "recommendation.min_similarity",
            self.min_similarity,
            0.0,
            1.0,
            "Similarity scores are ratios",
        )?;
        check_range(
            "recommendation.interaction_retention_days",
            self.interaction_retention_days,
            1,
            3650,
            "Retention is measured in days",
        )?;
        check_range(
            "recommendation.affinity_lookback_days",
            self.affinity_lookback_days,
            1,
            self.interaction_retention_days,
            "Affinity cannot look past the retention window",
        )?;
        for (field, value) in [
            ("recommendation.interaction_weights.view", self.interaction_weights.view),
            ("recommendation.interaction_weights.cart", self.interaction_weights.cart),
            ("recommendation.interaction_weights.wishlist", self.interaction_weights.wishlist),
            ("recommendation.interaction_weights.purchase", self.interaction_weights.purchase),
        ] {
            check_range(field, value, 0.0, 1000.0, "Interaction weights must be non-negative")?;
        }
        for period in TrendingPeriod::ALL {
            check_range(
                "recommendation.trending_staleness",
                self.trending_staleness.max_staleness(period).num_minutes(),
                1,
                7 * 24 * 60,
                "Staleness must be between one minute and one week",
            )?;
        }
        check_range(
            "recommendation.batch_threads",
            self.batch_threads,
            0,
            512,
            "Use 0 for one thread per CPU",
        )
    }

    fn config_name(&self) -> &'static str {
        "RecommendationConfig"
    }
}

// ============================================================================
// Autocomplete
// ============================================================================

/// Composite suggestion score weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionWeights {
    pub search_count: f64,
    pub click_count: f64,
    pub priority: f64,
    pub recency: f64,
}

impl Default for SuggestionWeights {
    fn default() -> Self {
        Self {
            search_count: 0.4,
            click_count: 0.3,
            priority: 0.2,
            recency: 0.1,
        }
    }
}

/// AutocompleteService configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Candidates fetched from each source before merging
    pub source_limit: usize,
    /// Minimum trigram similarity for fuzzy suggestions
    pub fuzzy_threshold: f64,
    pub weights: SuggestionWeights,
    /// Bonus for entries updated within `recent_days`
    pub recent_days: i64,
    pub recent_bonus: f64,
    /// Bonus for entries updated within `fresh_days`
    pub fresh_days: i64,
    pub fresh_bonus: f64,
    /// Popular-query cache
    pub popular_cache_ttl_secs: u64,
    pub popular_cache_capacity: u64,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

impl AutocompleteConfig {
    pub fn from_preset(preset: Preset) -> Self {
        let source_limit = match preset {
            Preset::Fast => 10,
            Preset::Balanced => 20,
            Preset::Thorough => 50,
        };
        Self {
            default_limit: 10,
            max_limit: 50,
            source_limit,
            fuzzy_threshold: catalog_storage::text::DEFAULT_TRIGRAM_THRESHOLD,
            weights: SuggestionWeights::default(),
            recent_days: 7,
            recent_bonus: 10.0,
            fresh_days: 30,
            fresh_bonus: 5.0,
            popular_cache_ttl_secs: 60,
            popular_cache_capacity: 1_000,
        }
    }

    pub fn popular_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.popular_cache_ttl_secs)
    }
}

impl Validatable for AutocompleteConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "autocomplete.max_limit",
            self.max_limit,
            1,
            500,
            "Suggestion lists must be bounded",
        )?;
        check_range(
            "autocomplete.default_limit",
            self.default_limit,
            1,
            self.max_limit,
            "Default limit must not exceed max_limit",
        )?;
        check_range(
            "autocomplete.source_limit",
            self.source_limit,
            1,
            1000,
            "Each source must contribute at least one candidate",
        )?;
        check_range(
            "autocomplete.fuzzy_threshold",
            self.fuzzy_threshold,
            0.0,
            1.0,
            "Trigram similarity is a ratio",
        )?;
        check_range(
            "autocomplete.recent_days",
            self.recent_days,
            0,
            self.fresh_days,
            "The recent window must fit inside the fresh window",
        )?;
        check_range(
            "autocomplete.popular_cache_ttl_secs",
            self.popular_cache_ttl_secs,
            1,
            86_400,
            "Popular cache TTL must be between 1s and one day",
        )
    }

    fn config_name(&self) -> &'static str {
        "AutocompleteConfig"
    }
}

// ============================================================================
// Category
// ============================================================================

/// CategoryHierarchyResolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Rebuild the tree snapshot when it is older than this
    pub refresh_interval_secs: u64,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
        }
    }
}

impl CategoryConfig {
    pub fn from_preset(_preset: Preset) -> Self {
        Self::default()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Validatable for CategoryConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "category.refresh_interval_secs",
            self.refresh_interval_secs,
            1,
            86_400,
            "Tree refresh must happen at least daily",
        )
    }

    fn config_name(&self) -> &'static str {
        "CategoryConfig"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for preset in Preset::ALL {
            SearchConfig::from_preset(preset).validate().unwrap();
            FacetConfig::from_preset(preset).validate().unwrap();
            RecommendationConfig::from_preset(preset).validate().unwrap();
            AutocompleteConfig::from_preset(preset).validate().unwrap();
            CategoryConfig::from_preset(preset).validate().unwrap();
        }
    }

    #[test]
    fn test_default_limit_above_max_rejected() {
        let mut config = SearchConfig::default();
        config.default_limit = config.max_limit + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Range { .. })));
    }

    #[test]
    fn test_single_term_synonym_group_rejected() {
        let config = SearchConfig::default().synonyms(vec![vec!["laptop".to_string()]]);
        assert!(matches!(config.validate(), Err(ConfigError::Custom(_))));
    }

    #[test]
    fn test_overlapping_price_buckets_rejected() {
        let config = FacetConfig {
            price_buckets: vec![
                PriceBucket::new("low", Some(0.0), Some(100.0)),
                PriceBucket::new("also low", Some(0.0), Some(100.0)),
            ],
            ..FacetConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Custom(_))));

        let config = FacetConfig {
            price_buckets: vec![
                PriceBucket::new("under 50", None, Some(50.0)),
                PriceBucket::new("anything", None, None),
            ],
            ..FacetConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Custom(_))));

        let config = FacetConfig {
            price_buckets: vec![
                PriceBucket::new("40 up", Some(40.0), None),
                PriceBucket::new("under 50", None, Some(50.0)),
            ],
            ..FacetConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Custom(_))));
    }

    #[test]
    fn test_unordered_disjoint_price_buckets_accepted() {
        let config = FacetConfig {
            price_buckets: vec![
                PriceBucket::new("100 up", Some(100.0), None),
                PriceBucket::new("under 50", None, Some(50.0)),
                PriceBucket::new("50 - 100", Some(50.0), Some(100.0)),
            ],
            ..FacetConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_price_bucket_rejected() {
        let mut config = FacetConfig::default();
        config.price_buckets.push(PriceBucket::new("bad", Some(10.0), Some(10.0)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interaction_weights_lookup() {
        let w = InteractionWeights::default();
        assert_eq!(w.weight(InteractionKind::View), 1.0);
        assert_eq!(w.weight(InteractionKind::Cart), 3.0);
        assert_eq!(w.weight(InteractionKind::Wishlist), 4.0);
        assert_eq!(w.weight(InteractionKind::Purchase), 5.0);
    }

    #[test]
    fn test_trending_staleness_defaults() {
        let s = TrendingStaleness::default();
        assert_eq!(s.max_staleness(TrendingPeriod::Daily), ChronoDuration::hours(1));
        assert_eq!(s.max_staleness(TrendingPeriod::Weekly), ChronoDuration::hours(6));
        assert_eq!(s.max_staleness(TrendingPeriod::Monthly), ChronoDuration::hours(24));
    }

    #[test]
    fn test_default_price_buckets_cover_zero_to_infinity() {
        let buckets = default_price_buckets();
        assert_eq!(buckets.first().and_then(|b| b.min), None);
        assert_eq!(buckets.last().and_then(|b| b.max), None);
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].max, pair[1].min);
        }
    }
}
