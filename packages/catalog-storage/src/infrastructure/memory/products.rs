//! In-memory product store
//!
//! The table lives behind `RwLock<Arc<HashMap>>`. Writers clone-on-write and
//! swap the `Arc`; [`ProductStore::snapshot`] hands out the current `Arc`, so a
//! snapshot never observes later writes. Every stored product carries its
//! search document, tokenized once on write.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::filter::{GroupKey, GroupValue, Page, ProductFilter, SortSpec};
use crate::domain::models::{Product, ProductId, TagId};
use crate::domain::ports::{ProductSnapshot, ProductStore};
use crate::error::{Result, StorageError};

type ProductTable = HashMap<ProductId, Product>;

/// Latency and failure injection for snapshot reads
///
/// Lets callers exercise deadline and partial-failure paths against the
/// in-memory store.
#[derive(Debug, Clone, Default)]
pub struct ProductFaults {
    /// Added to every `find_by_predicate` / `count_by_predicate`
    pub read_latency: Option<Duration>,
    /// Added to `count_by_group` for the given key
    pub group_latency: HashMap<GroupKey, Duration>,
    /// `count_by_group` fails for these keys
    pub failing_groups: HashSet<GroupKey>,
}

#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    table: Arc<RwLock<Arc<ProductTable>>>,
    faults: Arc<RwLock<ProductFaults>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let table: ProductTable = products
            .into_iter()
            .map(|mut p| {
                p.reindex();
                (p.id, p)
            })
            .collect();
        Self {
            table: Arc::new(RwLock::new(Arc::new(table))),
            faults: Arc::default(),
        }
    }

    pub fn set_faults(&self, faults: ProductFaults) {
        *self.faults.write() = faults;
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn snapshot(&self) -> Result<Arc<dyn ProductSnapshot>> {
        Ok(Arc::new(MemoryProductSnapshot {
            table: Arc::clone(&self.table.read()),
            faults: self.faults.read().clone(),
        }))
    }

    async fn upsert_product(&self, mut product: Product) -> Result<()> {
        product.reindex();
        let mut guard = self.table.write();
        Arc::make_mut(&mut guard).insert(product.id, product);
        Ok(())
    }

    async fn add_tag(&self, product_id: ProductId, tag_id: TagId) -> Result<bool> {
        let mut guard = self.table.write();
        if !guard.contains_key(&product_id) {
            return Err(StorageError::not_found("product", product_id));
        }
        if guard
            .get(&product_id)
            .map_or(false, |p| p.tags.contains(&tag_id))
        {
            return Ok(false);
        }
        if let Some(product) = Arc::make_mut(&mut guard).get_mut(&product_id) {
            product.tags.push(tag_id);
        }
        Ok(true)
    }
}

/// Frozen view of the product table
struct MemoryProductSnapshot {
    table: Arc<ProductTable>,
    faults: ProductFaults,
}

impl MemoryProductSnapshot {
    async fn read_delay(&self) {
        if let Some(latency) = self.faults.read_latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn matching<'a>(&'a self, filter: &'a ProductFilter) -> impl Iterator<Item = &'a Product> {
        self.table.values().filter(move |p| filter.matches(p))
    }
}

#[async_trait]
impl ProductSnapshot for MemoryProductSnapshot {
    async fn find_by_predicate(
        &self,
        filter: &ProductFilter,
        sort: &SortSpec,
        page: Page,
    ) -> Result<(Vec<Product>, usize)> {
        self.read_delay().await;
        let mut hits: Vec<&Product> = self.matching(filter).collect();
        let total = hits.len();
        hits.sort_by(|a, b| sort.compare(a, b, filter.now));
        let window = page.apply(hits).into_iter().cloned().collect();
        Ok((window, total))
    }

    async fn get_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.table.get(id).cloned())
            .collect())
    }

    async fn count_by_predicate(&self, filter: &ProductFilter) -> Result<u64> {
        self.read_delay().await;
        Ok(self.matching(filter).count() as u64)
    }

    async fn count_by_group(
        &self,
        filter: &ProductFilter,
        key: &GroupKey,
    ) -> Result<HashMap<GroupValue, u64>> {
        if let Some(latency) = self.faults.group_latency.get(key) {
            tokio::time::sleep(*latency).await;
        }
        if self.faults.failing_groups.contains(key) {
            return Err(StorageError::database(format!(
                "group count failed for {:?}",
                key
            )));
        }
        let mut counts = HashMap::new();
        for product in self.matching(filter) {
            for value in key.values_of(product) {
                *counts.entry(value).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
