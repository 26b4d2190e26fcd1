//! Domain assertions for catalog-engine tests

use catalog_engine::{FacetOutcome, FacetValue, Recommendations, SearchResponse};
use catalog_storage::ProductId;

pub fn ids(response: &SearchResponse) -> Vec<ProductId> {
    response.products.iter().map(|p| p.id).collect()
}

/// Values of an available facet dimension
pub fn facet_values<'a>(outcome: &'a FacetOutcome<Vec<FacetValue>>, dimension: &str) -> &'a [FacetValue] {
    match outcome.values() {
        Some(values) => values,
        None => panic!("Expected facet {dimension} to be available, got {outcome:?}"),
    }
}

/// Count of `key` within a facet dimension
pub fn facet_count(values: &[FacetValue], key: impl ToString) -> u64 {
    let key = key.to_string();
    values
        .iter()
        .find(|v| v.key == key)
        .map(|v| v.count)
        .unwrap_or_else(|| {
            panic!(
                "Expected facet key {key}, got keys {:?}",
                values.iter().map(|v| &v.key).collect::<Vec<_>>()
            )
        })
}

pub fn assert_facet_count(values: &[FacetValue], key: impl ToString, expected: u64) {
    let key = key.to_string();
    assert_eq!(
        facet_count(values, &key),
        expected,
        "Facet {key}: expected {expected}"
    );
}

/// Every product in the response satisfies `pred`
pub fn assert_all_products(response: &SearchResponse, what: &str, pred: impl Fn(&catalog_storage::Product) -> bool) {
    let offending: Vec<_> = response
        .products
        .iter()
        .filter(|p| !pred(p))
        .map(|p| p.id)
        .collect();
    assert!(offending.is_empty(), "Expected every product to be {what}, offending ids: {offending:?}");
}

pub fn assert_recommended(recs: &Recommendations, expected: &[ProductId]) {
    assert_eq!(
        recs.ids(),
        expected,
        "Strategy {:?} from {:?}: scores {:?}",
        recs.strategy,
        recs.source,
        recs.items.iter().map(|r| (r.product.id, r.score)).collect::<Vec<_>>()
    );
}
