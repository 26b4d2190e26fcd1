//! CategoryHierarchyResolver
//!
//! Holds the current [`CategoryTree`] snapshot. Readers clone the `Arc` and
//! keep a consistent tree for as long as they need it; writers serialize on an
//! async mutex, validate, write through the store and publish a new snapshot.
//! A load never replaces a tree whose load started later.

use catalog_storage::{Category, CategoryId, CategoryStore};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::tree::CategoryTree;
use crate::config::CategoryConfig;
use crate::errors::{CatalogError, Result};

pub struct CategoryHierarchyResolver {
    store: Arc<dyn CategoryStore>,
    snapshot: RwLock<Arc<CategoryTree>>,
    writer: Mutex<()>,
    refresh_interval: Duration,
}

impl CategoryHierarchyResolver {
    pub fn new(store: Arc<dyn CategoryStore>, config: &CategoryConfig) -> Self {
        Self {
            store,
            snapshot: RwLock::new(Arc::new(CategoryTree::unloaded())),
            writer: Mutex::new(()),
            refresh_interval: config.refresh_interval(),
        }
    }

    /// Current tree, reloaded first if never loaded or older than the refresh interval
    pub async fn tree(&self) -> Result<Arc<CategoryTree>> {
        let current = Arc::clone(&self.snapshot.read());
        match current.built_at() {
            Some(at) if at.elapsed() < self.refresh_interval => Ok(current),
            _ => self.refresh().await,
        }
    }

    /// Rebuild the tree from the store and publish it
    ///
    /// If a load that started later has already been published, that tree is
    /// kept and returned instead.
    pub async fn refresh(&self) -> Result<Arc<CategoryTree>> {
        let started = Instant::now();
        let categories = self.store.list_all().await?;
        let tree = Arc::new(CategoryTree::build_as_of(categories, started));

        let mut published = self.snapshot.write();
        if published.built_at().map_or(false, |at| at > started) {
            debug!(categories = tree.len(), "category tree superseded by a newer load");
            return Ok(Arc::clone(&published));
        }
        *published = Arc::clone(&tree);
        debug!(categories = tree.len(), "category tree rebuilt");
        Ok(tree)
    }

    pub async fn descendants(&self, id: CategoryId) -> Result<Vec<CategoryId>> {
        let tree = self.tree().await?;
        tree.descendants(id).map_err(log_integrity)
    }

    /// Union of `descendants` over `ids` (or `ids` themselves when
    /// subcategories are not requested); every id must exist
    pub async fn expand(
        &self,
        ids: &BTreeSet<CategoryId>,
        include_subcategories: bool,
    ) -> Result<BTreeSet<CategoryId>> {
        let tree = self.tree().await?;
        let mut expanded = BTreeSet::new();
        for &id in ids {
            if include_subcategories {
                expanded.extend(tree.descendants(id).map_err(log_integrity)?);
            } else if tree.contains(id) {
                expanded.insert(id);
            } else {
                return Err(CatalogError::not_found("category", id));
            }
        }
        Ok(expanded)
    }

    pub async fn path_to_root(&self, id: CategoryId) -> Result<Vec<Category>> {
        let tree = self.tree().await?;
        tree.path_to_root(id).map_err(log_integrity)
    }

    pub async fn ancestors(&self, id: CategoryId) -> Result<Vec<Category>> {
        let tree = self.tree().await?;
        tree.ancestors(id).map_err(log_integrity)
    }

    pub async fn rollup(&self, direct: &HashMap<CategoryId, u64>) -> Result<HashMap<CategoryId, u64>> {
        Ok(self.tree().await?.rollup(direct))
    }

    /// Validate and write a category, then publish a fresh tree
    ///
    /// - self-parent or re-parenting under an own descendant: `Integrity`
    /// - unknown parent: `NotFound`
    pub async fn upsert_category(&self, category: Category) -> Result<()> {
        let _guard = self.writer.lock().await;
        let tree = self.refresh().await?;

        if let Some(parent) = category.parent_id {
            if parent == category.id {
                return Err(log_integrity(CatalogError::integrity(format!(
                    "category {} cannot be its own parent",
                    category.id
                ))));
            }
            if !tree.contains(parent) {
                return Err(CatalogError::not_found("category", parent));
            }
            if tree.contains(category.id) && tree.is_below(category.id, parent)? {
                return Err(log_integrity(CatalogError::integrity(format!(
                    "moving category {} under its descendant {} would create a cycle",
                    category.id, parent
                ))));
            }
        }

        let id = category.id;
        self.store.upsert(category).await?;
        self.refresh().await?;
        info!(category_id = id, "category upserted");
        Ok(())
    }
}

fn log_integrity(err: CatalogError) -> CatalogError {
    if let CatalogError::Integrity(msg) = &err {
        error!(error = %msg, "category tree integrity violation");
    }
    err
}
