//! End-to-end storefront scenarios through `CatalogEngine`

mod common;

use catalog_engine::config::EngineConfig;
use catalog_engine::{AutocompleteRequest, SearchRequest, Source};
use catalog_storage::{
    InteractionKind, Order, RecommendationCacheStore, Shopper, SortField, SortOrder, SuggestionKind,
    TrendingPeriod, TrendingRow,
};
use chrono::{Duration, Utc};
use common::*;
use pretty_assertions::assert_eq;

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_exact_name_matches_rank_above_fuzzy_matches() {
    let harness = HarnessBuilder::new()
        .with_categories(fixture_categories())
        .with_products(fixture_headphone_names(5, 15))
        .build();

    let response = harness
        .engine
        .search(
            &SearchRequest::new()
                .query("headphones")
                .sort(SortField::Relevance, SortOrder::Desc)
                .page(0, 20),
        )
        .await
        .unwrap();

    assert_eq!(response.total, 20);
    assert_eq!(response.products.len(), 20);
    let mut top: Vec<_> = ids(&response).into_iter().take(5).collect();
    top.sort();
    assert_eq!(top, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_category_filter_walks_the_whole_subtree() {
    let harness = fixture_audio_harness().build();
    let search = |ids: Vec<u64>| SearchRequest::new().categories(ids).sort(SortField::Price, SortOrder::Asc);

    let response = harness.engine.search(&search(vec![ELECTRONICS])).await.unwrap();
    assert_eq!(response.total, 6);
    assert_all_products(&response, "under Electronics", |p| {
        [ELECTRONICS, HEADPHONES, WIRELESS].contains(&p.category_id)
    });

    let response = harness.engine.search(&search(vec![WIRELESS])).await.unwrap();
    assert_eq!(ids(&response), vec![2, 5, 4, 1]);

    let response = harness
        .engine
        .search(&search(vec![HEADPHONES]).without_subcategories())
        .await
        .unwrap();
    assert_eq!(ids(&response), vec![6, 3]);
}

#[tokio::test]
async fn test_brand_facet_lifts_its_own_constraint() {
    let harness = fixture_audio_harness().build();

    let response = harness
        .engine
        .search(&SearchRequest::new().brands([SONY]).with_facets())
        .await
        .unwrap();
    assert_eq!(response.total, 3);

    let facets = response.facets.expect("facets requested");
    assert!(facets.unavailable().is_empty());

    let brands = facet_values(&facets.brands, "brand");
    assert_facet_count(brands, SONY, 3);
    assert_facet_count(brands, BOSE, 2);
    assert_facet_count(brands, APPLE, 2);
    assert!(brands.iter().find(|v| v.key == SONY.to_string()).unwrap().selected);

    // Other dimensions keep the brand constraint: Sony only, rolled up
    let categories = facet_values(&facets.categories, "category");
    assert_facet_count(categories, WIRELESS, 2);
    assert_facet_count(categories, HEADPHONES, 3);
    assert_facet_count(categories, ELECTRONICS, 3);
    assert_facet_count(categories, COMPUTERS, 0);
    assert!(categories.iter().find(|v| v.key == COMPUTERS.to_string()).unwrap().disabled);
}

#[tokio::test]
async fn test_slow_facet_dimension_does_not_fail_the_search() {
    use catalog_storage::{GroupKey, ProductFaults};

    let harness = fixture_audio_harness()
        .config(EngineConfig::default().search(|s| s.request_timeout_ms(300)))
        .build();
    let mut faults = ProductFaults::default();
    faults.group_latency.insert(GroupKey::Tag, std::time::Duration::from_secs(30));
    harness.products.set_faults(faults);

    let response = harness
        .engine
        .search(&SearchRequest::new().brands([BOSE]).with_facets())
        .await
        .unwrap();

    assert_eq!(response.total, 2);
    let facets = response.facets.unwrap();
    assert_eq!(facets.unavailable(), vec!["tag".to_string()]);
    assert!(facets.brands.is_available());
    assert_eq!(harness.engine.metrics().facet_failure_count("tag"), 1);
}

// ============================================================================
// Recommendations
// ============================================================================

#[tokio::test]
async fn test_bought_together_requires_two_shared_orders() {
    let harness = fixture_audio_harness()
        .with_orders([
            Order::new(1, [1, 4]),
            Order::new(2, [1, 4, 5]),
            Order::new(3, [1, 6]),
        ])
        .build();

    let recs = harness
        .engine
        .recommendations()
        .frequently_bought_together(1, 10)
        .await
        .unwrap();

    assert_eq!(recs.source, Source::Live);
    assert_recommended(&recs, &[4]);
    assert_eq!(recs.items[0].score, 2.0);
}

#[tokio::test]
async fn test_stale_trending_cache_falls_back_to_interactions() {
    let harness = fixture_audio_harness().build();
    let recommendations = harness.engine.recommendations();

    harness
        .cache
        .replace_trending(
            TrendingPeriod::Daily,
            vec![TrendingRow {
                product_id: 7,
                period: TrendingPeriod::Daily,
                score: 100.0,
                updated_at: Utc::now() - Duration::hours(2),
            }],
        )
        .await
        .unwrap();

    let shopper = Shopper::User(42);
    recommendations.record_interaction(&shopper, 1, InteractionKind::View).await.unwrap();
    recommendations.record_interaction(&shopper, 2, InteractionKind::Purchase).await.unwrap();

    let recs = recommendations.trending(TrendingPeriod::Daily, 10).await.unwrap();
    assert_eq!(recs.source, Source::Live);
    assert_recommended(&recs, &[2, 1]);
}

#[tokio::test]
async fn test_fresh_trending_row_without_interactions_is_not_served() {
    let harness = fixture_audio_harness().build();
    let recommendations = harness.engine.recommendations();

    harness
        .cache
        .replace_trending(
            TrendingPeriod::Daily,
            vec![TrendingRow {
                product_id: 7,
                period: TrendingPeriod::Daily,
                score: 100.0,
                updated_at: Utc::now() - Duration::minutes(50),
            }],
        )
        .await
        .unwrap();

    let recs = recommendations.trending(TrendingPeriod::Daily, 10).await.unwrap();
    assert_eq!(recs.source, Source::Live);
    assert!(recs.items.is_empty(), "idle product 7 must not trend: {:?}", recs.ids());

    let shopper = Shopper::User(42);
    recommendations.record_interaction(&shopper, 3, InteractionKind::View).await.unwrap();

    let recs = recommendations.trending(TrendingPeriod::Daily, 10).await.unwrap();
    assert_eq!(recs.source, Source::Live);
    assert_recommended(&recs, &[3]);
}

#[tokio::test]
async fn test_batch_run_feeds_cached_reads() {
    let harness = fixture_audio_harness()
        .with_orders([Order::new(1, [1, 4]), Order::new(2, [1, 4])])
        .build();
    let recommendations = harness.engine.recommendations();

    let shopper = Shopper::User(7);
    recommendations.record_interaction(&shopper, 4, InteractionKind::Cart).await.unwrap();
    recommendations.record_interaction(&shopper, 2, InteractionKind::View).await.unwrap();

    let report = harness.engine.batch().run_all().await.unwrap();
    assert!(report.rows > 0);

    let trending = recommendations.trending(TrendingPeriod::Weekly, 10).await.unwrap();
    assert_eq!(trending.source, Source::Cache);
    assert_recommended(&trending, &[4, 2]);

    let together = recommendations.frequently_bought_together(4, 10).await.unwrap();
    assert_eq!(together.source, Source::Cache);
    assert_recommended(&together, &[1]);

    let personal = recommendations.personalized(&shopper, 10).await.unwrap();
    assert_eq!(personal.source, Source::Cache);
    assert!(!personal.ids().contains(&4));
    assert!(!personal.ids().contains(&2));
}

// ============================================================================
// Autocomplete
// ============================================================================

#[tokio::test]
async fn test_autocomplete_surfaces_synonyms_of_fuzzy_hits() {
    let harness = fixture_audio_harness()
        .with_suggestions([
            fixture_query_entry("laptop", 50).with_synonyms(["notebook"]),
            fixture_query_entry("notebook", 80),
        ])
        .build();

    let response = harness
        .engine
        .autocomplete(&AutocompleteRequest::new("lap").sources_off())
        .await
        .unwrap();

    let values: Vec<_> = response.suggestions.iter().map(|s| s.value.as_str()).collect();
    assert_eq!(values, vec!["notebook", "laptop"]);
    assert!(response.suggestions.iter().all(|s| s.kind == SuggestionKind::Query));
}

#[tokio::test]
async fn test_recorded_searches_become_popular_suggestions() {
    let harness = fixture_audio_harness().build();
    let shopper = Shopper::User(3);
    for _ in 0..2 {
        harness
            .engine
            .suggestions()
            .record_search("noise cancelling", Some(&shopper))
            .await
            .unwrap();
    }

    let response = harness
        .engine
        .autocomplete(&AutocompleteRequest::new("noise").user(3))
        .await
        .unwrap();

    assert_eq!(response.total, 1);
    let suggestion = &response.suggestions[0];
    assert_eq!(suggestion.value, "noise cancelling");
    assert!(suggestion.flags.popular && suggestion.flags.history);
    assert_eq!(harness.analytics.search_events().len(), 2);
}
