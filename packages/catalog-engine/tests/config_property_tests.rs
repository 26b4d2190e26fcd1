//! Property-based tests for engine configuration
//!
//! Invariants that should hold for ALL inputs:
//! - Roundtrip: from_yaml_str(to_yaml(x)) == x
//! - Validity: in-range values always validate
//! - Rejection: a default limit above its cap never validates
//! - Buckets: a bucket validates iff its bounds are non-negative and ordered
//! - Bucket sets: two closed buckets validate together iff they are disjoint

use catalog_engine::config::*;
use catalog_storage::InteractionKind;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

fn preset_from(idx: u8) -> Preset {
    Preset::ALL[idx as usize % Preset::ALL.len()]
}

#[quickcheck]
fn qc_preset_roundtrip(preset_idx: u8) -> bool {
    let config = match EngineConfig::preset(preset_from(preset_idx)).build() {
        Ok(config) => config,
        Err(_) => return false,
    };
    let yaml = match config.to_yaml() {
        Ok(yaml) => yaml,
        Err(_) => return false,
    };
    match EngineConfig::from_yaml_str(&yaml) {
        Ok(recovered) => *recovered == *config,
        Err(_) => false,
    }
}

#[quickcheck]
fn qc_search_limits_in_range_validate(max_limit: usize, default_limit: usize, timeout_ms: u64) -> TestResult {
    if max_limit == 0
        || max_limit > 1000
        || default_limit == 0
        || default_limit > max_limit
        || timeout_ms == 0
        || timeout_ms > 60_000
    {
        return TestResult::discard();
    }

    let mut config = SearchConfig::from_preset(Preset::Balanced);
    config.max_limit = max_limit;
    config.default_limit = default_limit;
    config.request_timeout_ms = timeout_ms;

    TestResult::from_bool(config.validate().is_ok())
}

#[quickcheck]
fn qc_default_above_cap_rejected(max_limit: usize, excess: usize) -> TestResult {
    if max_limit == 0 || max_limit > 1000 || excess == 0 || excess > 1000 {
        return TestResult::discard();
    }

    let mut search = SearchConfig::default();
    search.max_limit = max_limit;
    search.default_limit = max_limit + excess;

    let mut recommendation = RecommendationConfig::default();
    recommendation.max_limit = max_limit;
    recommendation.default_limit = max_limit + excess;

    TestResult::from_bool(search.validate().is_err() && recommendation.validate().is_err())
}

#[quickcheck]
fn qc_price_bucket_bounds(min: Option<u16>, max: Option<u16>) -> bool {
    let bucket = PriceBucket::new("generated", min.map(f64::from), max.map(f64::from));
    let ordered = match (min, max) {
        (Some(lo), Some(hi)) => lo < hi,
        _ => true,
    };
    bucket.validate().is_ok() == ordered
}

#[quickcheck]
fn qc_closed_bucket_pairs_must_be_disjoint(a: (u16, u16), b: (u16, u16)) -> TestResult {
    let (a_lo, a_hi) = (a.0.min(a.1), a.0.max(a.1));
    let (b_lo, b_hi) = (b.0.min(b.1), b.0.max(b.1));
    if a_lo == a_hi || b_lo == b_hi {
        return TestResult::discard();
    }
    let config = FacetConfig {
        price_buckets: vec![
            PriceBucket::new("a", Some(f64::from(a_lo)), Some(f64::from(a_hi))),
            PriceBucket::new("b", Some(f64::from(b_lo)), Some(f64::from(b_hi))),
        ],
        ..FacetConfig::default()
    };
    let disjoint = a_hi <= b_lo || b_hi <= a_lo;
    TestResult::from_bool(config.validate().is_ok() == disjoint)
}

#[quickcheck]
fn qc_interaction_weights_follow_config(view: u8, purchase: u8) -> bool {
    let mut config = RecommendationConfig::default();
    config.interaction_weights.view = f64::from(view);
    config.interaction_weights.purchase = f64::from(purchase);

    config.validate().is_ok()
        && config.interaction_weights.weight(InteractionKind::View) == f64::from(view)
        && config.interaction_weights.weight(InteractionKind::Purchase) == f64::from(purchase)
}

#[test]
fn test_unknown_version_rejected() {
    let err = EngineConfig::from_yaml_str("version: 2\npreset: fast\n").unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedVersion { found: 2, .. }));
}

#[test]
fn test_unknown_preset_rejected() {
    let err = EngineConfig::from_yaml_str("version: 1\npreset: turbo\n").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownPreset(_)));
}
