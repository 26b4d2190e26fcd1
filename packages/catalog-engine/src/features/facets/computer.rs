//! FacetComputer
//!
//! Each dimension is counted against the base filter with that dimension's
//! own constraint lifted, so picking a brand never hides the other brands.
//! Dimensions run concurrently on a `JoinSet` under the request deadline; a
//! dimension that errors or misses the deadline comes back `Unavailable`
//! while the rest of the set is still returned.

use catalog_storage::{
    Attribute, GroupKey, GroupValue, ProductFilter, ProductSnapshot, ProductStatus, StockState,
    TaxonomyStore,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::domain::*;
use crate::config::FacetConfig;
use crate::errors::{CatalogError, Result};
use crate::features::category::CategoryHierarchyResolver;
use crate::metrics::EngineMetrics;

const DEADLINE_REASON: &str = "deadline exceeded";
const ABORTED_REASON: &str = "facet task aborted";

pub struct FacetComputer {
    taxonomy: Arc<dyn TaxonomyStore>,
    categories: Arc<CategoryHierarchyResolver>,
    config: Arc<FacetConfig>,
    low_stock_threshold: u32,
    metrics: Arc<EngineMetrics>,
}

impl FacetComputer {
    pub fn new(
        taxonomy: Arc<dyn TaxonomyStore>,
        categories: Arc<CategoryHierarchyResolver>,
        config: FacetConfig,
        low_stock_threshold: u32,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            taxonomy,
            categories,
            config: Arc::new(config),
            low_stock_threshold,
            metrics,
        }
    }

    fn job(
        &self,
        snapshot: Arc<dyn ProductSnapshot>,
        base: Arc<ProductFilter>,
        selection: Arc<FacetSelection>,
        attributes: Arc<Vec<Attribute>>,
    ) -> FacetJob {
        FacetJob {
            snapshot,
            base,
            selection,
            attributes,
            taxonomy: Arc::clone(&self.taxonomy),
            categories: Arc::clone(&self.categories),
            config: Arc::clone(&self.config),
            low_stock_threshold: self.low_stock_threshold,
        }
    }

    /// Count one dimension with its own constraint removed from `base`
    pub async fn compute_facet(
        &self,
        snapshot: Arc<dyn ProductSnapshot>,
        base: &ProductFilter,
        dimension: FacetDimension,
        selection: &FacetSelection,
    ) -> Result<Vec<FacetValue>> {
        let attributes = match dimension {
            FacetDimension::Attribute(_) => self.taxonomy.list_attributes().await?,
            _ => Vec::new(),
        };
        self.job(
            snapshot,
            Arc::new(base.clone()),
            Arc::new(selection.clone()),
            Arc::new(attributes),
        )
        .run(dimension)
        .await
    }

    /// Every dimension, fanned out concurrently and bounded by `deadline`
    pub async fn compute(
        &self,
        snapshot: Arc<dyn ProductSnapshot>,
        base: &ProductFilter,
        selection: &FacetSelection,
        deadline: Instant,
    ) -> FacetSet {
        let attributes =
            match tokio::time::timeout_at(deadline, self.taxonomy.list_attributes()).await {
                Ok(Ok(attributes)) => Ok(attributes),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(DEADLINE_REASON.to_string()),
            };

        let mut dimensions = vec![
            FacetDimension::Category,
            FacetDimension::Brand,
            FacetDimension::Tag,
            FacetDimension::PriceBucket,
            FacetDimension::Stock,
            FacetDimension::Status,
        ];
        let attribute_list = match &attributes {
            Ok(list) => {
                dimensions.extend(list.iter().map(|a| FacetDimension::Attribute(a.id)));
                list.clone()
            }
            Err(reason) => {
                warn!(reason = %reason, "attribute list unavailable for facets");
                self.metrics.facet_failure("attributes");
                Vec::new()
            }
        };

        let job = self.job(
            snapshot,
            Arc::new(base.clone()),
            Arc::new(selection.clone()),
            Arc::new(attribute_list),
        );

        let mut set = JoinSet::new();
        for dimension in dimensions.iter().copied() {
            let job = job.clone();
            set.spawn(async move { (dimension, job.run(dimension).await) });
        }

        let mut outcomes: BTreeMap<FacetDimension, ValueOutcome> = BTreeMap::new();
        let mut missing_reason = ABORTED_REASON;
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((dimension, Ok(values))))) => {
                    outcomes.insert(dimension, FacetOutcome::Available { values });
                }
                Ok(Some(Ok((dimension, Err(e))))) => {
                    warn!(dimension = %dimension.name(), error = %e, "facet dimension failed");
                    outcomes.insert(dimension, FacetOutcome::unavailable(e.to_string()));
                }
                Ok(Some(Err(join_error))) => {
                    warn!(error = %join_error, "facet task aborted");
                }
                Ok(None) => break,
                Err(_) => {
                    debug!(pending = set.len(), "facet deadline reached");
                    set.abort_all();
                    missing_reason = DEADLINE_REASON;
                    break;
                }
            }
        }

        for dimension in &dimensions {
            let outcome = outcomes
                .entry(*dimension)
                .or_insert_with(|| FacetOutcome::unavailable(missing_reason));
            if !outcome.is_available() {
                self.metrics.facet_failure(&dimension.name());
            }
        }

        let attributes = match attributes {
            Ok(_) => FacetOutcome::Available {
                values: job
                    .attributes
                    .iter()
                    .map(|a| AttributeFacet {
                        attribute_id: a.id,
                        name: a.name.clone(),
                        slug: a.slug.clone(),
                        outcome: outcomes
                            .remove(&FacetDimension::Attribute(a.id))
                            .unwrap_or_else(|| FacetOutcome::unavailable(DEADLINE_REASON)),
                    })
                    .collect(),
            },
            Err(reason) => FacetOutcome::unavailable(reason),
        };

        let mut take = |dimension: FacetDimension| {
            outcomes
                .remove(&dimension)
                .unwrap_or_else(|| FacetOutcome::unavailable(DEADLINE_REASON))
        };
        FacetSet {
            categories: take(FacetDimension::Category),
            brands: take(FacetDimension::Brand),
            tags: take(FacetDimension::Tag),
            price_ranges: take(FacetDimension::PriceBucket),
            stock: take(FacetDimension::Stock),
            statuses: take(FacetDimension::Status),
            attributes,
        }
    }
}

/// Everything one dimension task needs, owned so it can be spawned
#[derive(Clone)]
struct FacetJob {
    snapshot: Arc<dyn ProductSnapshot>,
    base: Arc<ProductFilter>,
    selection: Arc<FacetSelection>,
    attributes: Arc<Vec<Attribute>>,
    taxonomy: Arc<dyn TaxonomyStore>,
    categories: Arc<CategoryHierarchyResolver>,
    config: Arc<FacetConfig>,
    low_stock_threshold: u32,
}

impl FacetJob {
    async fn run(&self, dimension: FacetDimension) -> Result<Vec<FacetValue>> {
        let filter = dimension.lift(&self.base);
        match dimension {
            FacetDimension::Category => self.categories(&filter).await,
            FacetDimension::Brand => self.brands(&filter).await,
            FacetDimension::Attribute(id) => self.terms(&filter, id).await,
            FacetDimension::Tag => self.tags(&filter).await,
            FacetDimension::PriceBucket => self.price_buckets(&filter).await,
            FacetDimension::Stock => self.stock(&filter).await,
            FacetDimension::Status => self.statuses(&filter).await,
        }
    }

    async fn grouped(&self, filter: &ProductFilter, key: GroupKey) -> Result<HashMap<GroupValue, u64>> {
        Ok(self.snapshot.count_by_group(filter, &key).await?)
    }

    async fn categories(&self, filter: &ProductFilter) -> Result<Vec<FacetValue>> {
        let tree = self.categories.tree().await?;
        let direct: HashMap<_, _> = self
            .grouped(filter, GroupKey::Category)
            .await?
            .into_iter()
            .filter_map(|(value, count)| match value {
                GroupValue::Category(id) => Some((id, count)),
                _ => None,
            })
            .collect();
        let counts = if self.config.category_rollup {
            tree.rollup(&direct)
        } else {
            direct
        };
        Ok(tree
            .categories()
            .filter(|c| c.is_active)
            .map(|c| {
                FacetValue::new(
                    c.id,
                    c.name.clone(),
                    counts.get(&c.id).copied().unwrap_or(0),
                    self.selection.categories.contains(&c.id),
                )
            })
            .collect())
    }

    async fn brands(&self, filter: &ProductFilter) -> Result<Vec<FacetValue>> {
        let counts = self.grouped(filter, GroupKey::Brand).await?;
        Ok(self
            .taxonomy
            .list_brands()
            .await?
            .into_iter()
            .map(|b| {
                let count = counts.get(&GroupValue::Brand(b.id)).copied().unwrap_or(0);
                FacetValue::new(b.id, b.name, count, self.selection.brands.contains(&b.id))
            })
            .collect())
    }

    async fn tags(&self, filter: &ProductFilter) -> Result<Vec<FacetValue>> {
        let counts = self.grouped(filter, GroupKey::Tag).await?;
        Ok(self
            .taxonomy
            .list_tags()
            .await?
            .into_iter()
            .map(|t| {
                let count = counts.get(&GroupValue::Tag(t.id)).copied().unwrap_or(0);
                FacetValue::new(t.id, t.name, count, self.selection.tags.contains(&t.id))
            })
            .collect())
    }

    async fn terms(
        &self,
        filter: &ProductFilter,
        attribute_id: catalog_storage::AttributeId,
    ) -> Result<Vec<FacetValue>> {
        let Some(attribute) = self.attributes.iter().find(|a| a.id == attribute_id) else {
            return Err(CatalogError::not_found("attribute", attribute_id));
        };
        let counts = self.grouped(filter, GroupKey::Term(attribute_id)).await?;
        Ok(attribute
            .terms
            .iter()
            .map(|term| {
                let count = counts.get(&GroupValue::Term(term.id)).copied().unwrap_or(0);
                FacetValue::new(
                    term.id,
                    term.name.clone(),
                    count,
                    self.selection.term_selected(attribute_id, term.id),
                )
            })
            .collect())
    }

    async fn price_buckets(&self, filter: &ProductFilter) -> Result<Vec<FacetValue>> {
        let mut values = Vec::with_capacity(self.config.price_buckets.len());
        for (index, bucket) in self.config.price_buckets.iter().enumerate() {
            let mut bucket_filter = filter.clone();
            bucket_filter.price_bucket = Some(catalog_storage::PriceRange::half_open(
                bucket.min, bucket.max,
            ));
            let count = self.snapshot.count_by_predicate(&bucket_filter).await?;
            let selected = self.selection.price == Some((bucket.min, bucket.max));
            values.push(FacetValue::new(index, bucket.label.clone(), count, selected));
        }
        Ok(values)
    }

    async fn stock(&self, filter: &ProductFilter) -> Result<Vec<FacetValue>> {
        let counts = self
            .grouped(
                filter,
                GroupKey::Stock {
                    low_stock_threshold: self.low_stock_threshold,
                },
            )
            .await?;
        Ok([StockState::InStock, StockState::LowStock, StockState::OutOfStock]
            .into_iter()
            .map(|state| {
                let count = counts.get(&GroupValue::Stock(state)).copied().unwrap_or(0);
                stock_value(state, count, self.selection.stock_selected(state))
            })
            .collect())
    }

    async fn statuses(&self, filter: &ProductFilter) -> Result<Vec<FacetValue>> {
        let counts = self.grouped(filter, GroupKey::Status).await?;
        Ok(ProductStatus::ALL
            .into_iter()
            .map(|status| {
                let count = counts.get(&GroupValue::Status(status)).copied().unwrap_or(0);
                FacetValue::new(
                    status.as_str(),
                    status.as_str(),
                    count,
                    self.selection.statuses.contains(&status),
                )
            })
            .collect())
    }
}
