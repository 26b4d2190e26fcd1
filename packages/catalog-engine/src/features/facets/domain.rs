//! Facet domain types

use catalog_storage::{
    AttributeId, BrandId, CategoryId, ProductFilter, ProductStatus, StockState, TagId, TermId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One filter dimension a facet is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetDimension {
    Category,
    Brand,
    Attribute(AttributeId),
    Tag,
    PriceBucket,
    Stock,
    Status,
}

impl FacetDimension {
    /// Label used in logs and metrics
    pub fn name(&self) -> String {
        match self {
            FacetDimension::Category => "category".to_string(),
            FacetDimension::Brand => "brand".to_string(),
            FacetDimension::Attribute(id) => format!("attribute:{}", id),
            FacetDimension::Tag => "tag".to_string(),
            FacetDimension::PriceBucket => "price".to_string(),
            FacetDimension::Stock => "stock".to_string(),
            FacetDimension::Status => "status".to_string(),
        }
    }

    /// `filter` with this dimension's own constraint removed
    pub fn lift(&self, filter: &ProductFilter) -> ProductFilter {
        let mut lifted = filter.clone();
        match self {
            FacetDimension::Category => lifted.category_ids = None,
            FacetDimension::Brand => lifted.brand_ids = None,
            FacetDimension::Attribute(id) => lifted.attributes.retain(|c| c.attribute_id != *id),
            FacetDimension::Tag => lifted.tags = None,
            FacetDimension::PriceBucket => {
                lifted.price = None;
                lifted.price_bucket = None;
            }
            FacetDimension::Stock => lifted.in_stock = None,
            FacetDimension::Status => lifted.statuses = None,
        }
        lifted
    }
}

/// One countable value of a dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub key: String,
    pub label: String,
    pub count: u64,
    /// Part of the active filter
    pub selected: bool,
    /// Zero matches; listed so the shopper sees the option exists
    pub disabled: bool,
}

impl FacetValue {
    pub fn new(key: impl ToString, label: impl Into<String>, count: u64, selected: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.into(),
            count,
            selected,
            disabled: count == 0,
        }
    }
}

/// Result of one dimension: counted, or flagged with why it could not be
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FacetOutcome<T> {
    Available { values: T },
    Unavailable { reason: String },
}

impl<T> FacetOutcome<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        FacetOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FacetOutcome::Available { .. })
    }

    pub fn values(&self) -> Option<&T> {
        match self {
            FacetOutcome::Available { values } => Some(values),
            FacetOutcome::Unavailable { .. } => None,
        }
    }
}

pub type ValueOutcome = FacetOutcome<Vec<FacetValue>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFacet {
    pub attribute_id: AttributeId,
    pub name: String,
    pub slug: String,
    pub outcome: ValueOutcome,
}

/// Every dimension of one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetSet {
    pub categories: ValueOutcome,
    pub brands: ValueOutcome,
    pub attributes: FacetOutcome<Vec<AttributeFacet>>,
    pub tags: ValueOutcome,
    pub price_ranges: ValueOutcome,
    /// `in_stock`, `low_stock`, `out_of_stock`
    pub stock: ValueOutcome,
    pub statuses: ValueOutcome,
}

impl FacetSet {
    /// Dimensions that could not be computed
    pub fn unavailable(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (name, available) in [
            ("category", self.categories.is_available()),
            ("brand", self.brands.is_available()),
            ("attributes", self.attributes.is_available()),
            ("tag", self.tags.is_available()),
            ("price", self.price_ranges.is_available()),
            ("stock", self.stock.is_available()),
            ("status", self.statuses.is_available()),
        ] {
            if !available {
                names.push(name.to_string());
            }
        }
        if let Some(attributes) = self.attributes.values() {
            for a in attributes.iter().filter(|a| !a.outcome.is_available()) {
                names.push(FacetDimension::Attribute(a.attribute_id).name());
            }
        }
        names
    }
}

/// What the shopper currently has selected, for the `selected` markers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetSelection {
    pub categories: BTreeSet<CategoryId>,
    pub brands: BTreeSet<BrandId>,
    pub tags: BTreeSet<TagId>,
    pub terms: BTreeMap<AttributeId, BTreeSet<TermId>>,
    pub price: Option<(Option<f64>, Option<f64>)>,
    pub in_stock: Option<bool>,
    pub statuses: BTreeSet<ProductStatus>,
}

impl FacetSelection {
    pub fn stock_selected(&self, state: StockState) -> bool {
        match (self.in_stock, state) {
            (Some(true), StockState::InStock | StockState::LowStock) => true,
            (Some(false), StockState::OutOfStock) => true,
            _ => false,
        }
    }

    pub fn term_selected(&self, attribute_id: AttributeId, term_id: TermId) -> bool {
        self.terms
            .get(&attribute_id)
            .map_or(false, |terms| terms.contains(&term_id))
    }
}

pub fn stock_key(state: StockState) -> &'static str {
    match state {
        StockState::InStock => "in_stock",
        StockState::LowStock => "low_stock",
        StockState::OutOfStock => "out_of_stock",
    }
}

fn stock_label(state: StockState) -> &'static str {
    match state {
        StockState::InStock => "In stock",
        StockState::LowStock => "Low stock",
        StockState::OutOfStock => "Out of stock",
    }
}

pub fn stock_value(state: StockState, count: u64, selected: bool) -> FacetValue {
    FacetValue::new(stock_key(state), stock_label(state), count, selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_storage::{AttributeConstraint, PriceRange};

    fn full_filter() -> ProductFilter {
        let mut f = ProductFilter::active().with_categories([1, 2]).with_brands([3]);
        f.tags = Some([4].into_iter().collect());
        f.attributes = vec![AttributeConstraint::new(5, [50]), AttributeConstraint::new(6, [60])];
        f.price = Some(PriceRange::new(Some(10.0), Some(20.0)));
        f.in_stock = Some(true);
        f
    }

    #[test]
    fn test_lift_removes_only_own_dimension() {
        let f = full_filter();

        let brand = FacetDimension::Brand.lift(&f);
        assert!(brand.brand_ids.is_none());
        assert_eq!(brand.category_ids, f.category_ids);
        assert_eq!(brand.tags, f.tags);

        let attr = FacetDimension::Attribute(5).lift(&f);
        assert_eq!(attr.attributes.len(), 1);
        assert_eq!(attr.attributes[0].attribute_id, 6);

        let price = FacetDimension::PriceBucket.lift(&f);
        assert!(price.price.is_none());
        assert_eq!(price.in_stock, Some(true));

        assert!(FacetDimension::Status.lift(&f).statuses.is_none());
        assert!(FacetDimension::Stock.lift(&f).in_stock.is_none());
    }

    #[test]
    fn test_zero_count_is_disabled() {
        assert!(FacetValue::new(1, "Sony", 0, false).disabled);
        assert!(!FacetValue::new(1, "Sony", 3, false).disabled);
    }

    #[test]
    fn test_outcome_serializes_with_state_tag() {
        let outcome: ValueOutcome = FacetOutcome::unavailable("deadline exceeded");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"], "unavailable");
        assert_eq!(json["reason"], "deadline exceeded");
    }

    #[test]
    fn test_stock_selection() {
        let sel = FacetSelection {
            in_stock: Some(true),
            ..FacetSelection::default()
        };
        assert!(sel.stock_selected(StockState::InStock));
        assert!(sel.stock_selected(StockState::LowStock));
        assert!(!sel.stock_selected(StockState::OutOfStock));
    }
}
