//! Prometheus metrics for the engine

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry,
};

/// Engine-wide counters, registered against a caller-supplied registry
#[derive(Clone)]
pub struct EngineMetrics {
    pub search_requests: IntCounter,
    pub search_timeouts: IntCounter,
    pub search_latency: Histogram,
    /// Labelled by dimension
    pub facet_failures: IntCounterVec,
    /// Labelled by strategy
    pub recommendation_cache_hits: IntCounterVec,
    /// Labelled by strategy
    pub recommendation_cache_misses: IntCounterVec,
    pub autocomplete_requests: IntCounter,
    pub autocomplete_latency: Histogram,
}

impl EngineMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            search_requests: register_int_counter_with_registry!(
                Opts::new("catalog_search_requests_total", "Search requests"),
                registry
            )?,
            search_timeouts: register_int_counter_with_registry!(
                Opts::new(
                    "catalog_search_timeouts_total",
                    "Searches whose ranked query missed the deadline"
                ),
                registry
            )?,
            search_latency: register_histogram_with_registry!(
                HistogramOpts::new("catalog_search_latency_seconds", "Search latency")
                    .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
                registry
            )?,
            facet_failures: register_int_counter_vec_with_registry!(
                Opts::new(
                    "catalog_facet_failures_total",
                    "Facet dimensions returned as unavailable"
                ),
                &["dimension"],
                registry
            )?,
            recommendation_cache_hits: register_int_counter_vec_with_registry!(
                Opts::new(
                    "catalog_recommendation_cache_hits_total",
                    "Recommendation requests served from precomputed rows"
                ),
                &["strategy"],
                registry
            )?,
            recommendation_cache_misses: register_int_counter_vec_with_registry!(
                Opts::new(
                    "catalog_recommendation_cache_misses_total",
                    "Recommendation requests served by live fallback"
                ),
                &["strategy"],
                registry
            )?,
            autocomplete_requests: register_int_counter_with_registry!(
                Opts::new("catalog_autocomplete_requests_total", "Autocomplete requests"),
                registry
            )?,
            autocomplete_latency: register_histogram_with_registry!(
                HistogramOpts::new("catalog_autocomplete_latency_seconds", "Autocomplete latency")
                    .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
                registry
            )?,
        })
    }

    /// Metrics on a private registry (tests, embedded callers)
    pub fn unregistered() -> Result<Self, prometheus::Error> {
        Self::new(&Registry::new())
    }

    pub fn cache_hit(&self, strategy: &str) {
        self.recommendation_cache_hits
            .with_label_values(&[strategy])
            .inc();
    }

    pub fn cache_miss(&self, strategy: &str) {
        self.recommendation_cache_misses
            .with_label_values(&[strategy])
            .inc();
    }

    pub fn cache_hit_rate(&self, strategy: &str) -> f64 {
        let hits = self
            .recommendation_cache_hits
            .with_label_values(&[strategy])
            .get() as f64;
        let total = hits
            + self
                .recommendation_cache_misses
                .with_label_values(&[strategy])
                .get() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    pub fn facet_failure(&self, dimension: &str) {
        self.facet_failures.with_label_values(&[dimension]).inc();
    }

    pub fn facet_failure_count(&self, dimension: &str) -> u64 {
        self.facet_failures.with_label_values(&[dimension]).get()
    }
}
