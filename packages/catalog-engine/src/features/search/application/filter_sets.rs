//! Saved filter presets

use catalog_storage::{FilterSet, FilterSetStore, Shopper, StorageError};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::errors::{CatalogError, Result};
use crate::features::search::domain::SearchRequest;

pub struct FilterSetService {
    store: Arc<dyn FilterSetStore>,
}

impl FilterSetService {
    pub fn new(store: Arc<dyn FilterSetStore>) -> Self {
        Self { store }
    }

    /// Save `request` under `name`; a name the owner already uses is a
    /// `DuplicateAssociation`
    pub async fn save(&self, owner: Shopper, name: &str, request: &SearchRequest) -> Result<FilterSet> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::invalid_filter("filter set name is empty"));
        }
        let mut stored = request.clone();
        stored.shopper = None;
        let filters = serde_json::to_value(&stored).map_err(StorageError::from)?;

        let filter_set = FilterSet::new(owner, name, filters);
        self.store.save(filter_set.clone()).await?;
        info!(id = %filter_set.id, name, "filter set saved");
        Ok(filter_set)
    }

    pub async fn list(&self, owner: &Shopper) -> Result<Vec<FilterSet>> {
        Ok(self.store.list(owner).await?)
    }

    /// Load a preset as a request and count the use
    pub async fn apply(&self, id: Uuid) -> Result<SearchRequest> {
        let filter_set = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("filter set", id))?;
        let request: SearchRequest =
            serde_json::from_value(filter_set.filters).map_err(StorageError::from)?;
        self.store.increment_usage(id).await?;
        Ok(request)
    }
}
