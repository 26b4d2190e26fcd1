//! Search request and response shapes

use catalog_storage::{
    AttributeId, BrandId, CategoryId, Product, ProductStatus, Shopper, SortField, SortOrder,
    TagId, TermId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::SearchConfig;
use crate::errors::{CatalogError, Result};
use crate::features::facets::{FacetSelection, FacetSet};

/// At least one of `term_ids` for `attribute_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub attribute_id: AttributeId,
    pub term_ids: Vec<TermId>,
}

/// Free text plus structured filters, sort and paging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub category_ids: Option<Vec<CategoryId>>,
    pub include_subcategories: bool,
    pub brand_ids: Option<Vec<BrandId>>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub tags: Option<Vec<TagId>>,
    pub attributes: Option<Vec<AttributeFilter>>,
    pub in_stock: Option<bool>,
    pub on_sale: Option<bool>,
    pub featured: Option<bool>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub statuses: Option<Vec<ProductStatus>>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    /// Falls back to `search.default_limit`
    pub limit: Option<usize>,
    pub offset: usize,
    pub include_facets: bool,
    /// Who searched; only used for the analytics event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopper: Option<Shopper>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            category_ids: None,
            include_subcategories: true,
            brand_ids: None,
            price_min: None,
            price_max: None,
            tags: None,
            attributes: None,
            in_stock: None,
            on_sale: None,
            featured: None,
            created_after: None,
            created_before: None,
            statuses: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            limit: None,
            offset: 0,
            include_facets: false,
            shopper: None,
        }
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn categories(mut self, ids: impl IntoIterator<Item = CategoryId>) -> Self {
        self.category_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn without_subcategories(mut self) -> Self {
        self.include_subcategories = false;
        self
    }

    pub fn brands(mut self, ids: impl IntoIterator<Item = BrandId>) -> Self {
        self.brand_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn price(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    pub fn tags(mut self, ids: impl IntoIterator<Item = TagId>) -> Self {
        self.tags = Some(ids.into_iter().collect());
        self
    }

    pub fn attribute(
        mut self,
        attribute_id: AttributeId,
        term_ids: impl IntoIterator<Item = TermId>,
    ) -> Self {
        self.attributes.get_or_insert_with(Vec::new).push(AttributeFilter {
            attribute_id,
            term_ids: term_ids.into_iter().collect(),
        });
        self
    }

    pub fn in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = Some(in_stock);
        self
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = ProductStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.sort_order = order;
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn with_facets(mut self) -> Self {
        self.include_facets = true;
        self
    }

    pub fn by(mut self, shopper: Shopper) -> Self {
        self.shopper = Some(shopper);
        self
    }

    /// Trimmed query, `None` when blank
    pub fn text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn effective_limit(&self, config: &SearchConfig) -> usize {
        self.limit.unwrap_or(config.default_limit)
    }

    /// Reject contradictory or out-of-range filters before any query runs
    pub fn validate(&self, config: &SearchConfig) -> Result<()> {
        for (name, bound) in [("price_min", self.price_min), ("price_max", self.price_max)] {
            if let Some(value) = bound {
                if value.is_nan() {
                    return Err(CatalogError::invalid_filter(format!("{} is not a number", name)));
                }
                if value < 0.0 {
                    return Err(CatalogError::invalid_filter(format!(
                        "{} must not be negative, got {}",
                        name, value
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(CatalogError::invalid_filter(format!(
                    "price_min {} is greater than price_max {}",
                    min, max
                )));
            }
        }

        for (name, empty) in [
            ("category_ids", self.category_ids.as_ref().map_or(false, Vec::is_empty)),
            ("brand_ids", self.brand_ids.as_ref().map_or(false, Vec::is_empty)),
            ("tags", self.tags.as_ref().map_or(false, Vec::is_empty)),
            ("statuses", self.statuses.as_ref().map_or(false, Vec::is_empty)),
        ] {
            if empty {
                return Err(CatalogError::invalid_filter(format!(
                    "{} was given but is empty",
                    name
                )));
            }
        }
        if let Some(attribute) = self
            .attributes
            .iter()
            .flatten()
            .find(|a| a.term_ids.is_empty())
        {
            return Err(CatalogError::invalid_filter(format!(
                "attribute {} has an empty term set",
                attribute.attribute_id
            )));
        }

        if let (Some(after), Some(before)) = (self.created_after, self.created_before) {
            if after > before {
                return Err(CatalogError::invalid_filter(format!(
                    "created_after {} is later than created_before {}",
                    after, before
                )));
            }
        }

        let limit = self.effective_limit(config);
        if limit == 0 || limit > config.max_limit {
            return Err(CatalogError::invalid_filter(format!(
                "limit must be between 1 and {}, got {}",
                config.max_limit, limit
            )));
        }
        Ok(())
    }

    /// Values the shopper has selected, as facet markers see them
    pub fn facet_selection(&self) -> FacetSelection {
        let mut terms: BTreeMap<AttributeId, BTreeSet<TermId>> = BTreeMap::new();
        for a in self.attributes.iter().flatten() {
            terms
                .entry(a.attribute_id)
                .or_default()
                .extend(a.term_ids.iter().copied());
        }
        FacetSelection {
            categories: self.category_ids.iter().flatten().copied().collect(),
            brands: self.brand_ids.iter().flatten().copied().collect(),
            tags: self.tags.iter().flatten().copied().collect(),
            terms,
            price: (self.price_min.is_some() || self.price_max.is_some())
                .then_some((self.price_min, self.price_max)),
            in_stock: self.in_stock,
            statuses: self.statuses.iter().flatten().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub products: Vec<Product>,
    /// Every match before pagination
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<FacetSet>,
    pub query_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config() -> SearchConfig {
        SearchConfig::default()
    }

    fn invalid(request: SearchRequest) -> bool {
        matches!(request.validate(&config()), Err(CatalogError::InvalidFilter(_)))
    }

    #[test]
    fn test_defaults() {
        let request: SearchRequest = serde_json::from_str("{}").unwrap();
        assert!(request.include_subcategories);
        assert_eq!(request.sort_by, SortField::CreatedAt);
        assert_eq!(request.sort_order, SortOrder::Desc);
        assert_eq!(request.effective_limit(&config()), 20);
        request.validate(&config()).unwrap();
    }

    #[test]
    fn test_contradictory_filters_rejected() {
        assert!(invalid(SearchRequest::new().price(Some(100.0), Some(50.0))));
        assert!(invalid(SearchRequest::new().price(Some(-1.0), None)));
        assert!(invalid(SearchRequest::new().price(Some(f64::NAN), None)));
        assert!(invalid(SearchRequest::new().brands(Vec::<BrandId>::new())));
        assert!(invalid(SearchRequest::new().attribute(1, Vec::<TermId>::new())));
        assert!(invalid(SearchRequest::new().page(0, 0)));
        assert!(invalid(SearchRequest::new().page(0, 101)));

        let now = Utc::now();
        let mut request = SearchRequest::new();
        request.created_after = Some(now);
        request.created_before = Some(now - Duration::days(1));
        assert!(invalid(request));
    }

    #[test]
    fn test_equal_price_bounds_allowed() {
        SearchRequest::new()
            .price(Some(50.0), Some(50.0))
            .validate(&config())
            .unwrap();
    }

    #[test]
    fn test_blank_query_is_no_query() {
        assert_eq!(SearchRequest::new().query("   ").text(), None);
        assert_eq!(SearchRequest::new().query(" tv ").text(), Some("tv"));
    }

    #[test]
    fn test_facet_selection() {
        let selection = SearchRequest::new()
            .brands([1, 2])
            .attribute(5, [50, 51])
            .price(Some(50.0), Some(100.0))
            .facet_selection();
        assert_eq!(selection.brands.len(), 2);
        assert!(selection.term_selected(5, 51));
        assert_eq!(selection.price, Some((Some(50.0), Some(100.0))));
        assert!(SearchRequest::new().facet_selection().price.is_none());
    }
}
