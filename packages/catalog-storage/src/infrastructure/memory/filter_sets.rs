//! In-memory saved filter sets

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::{FilterSet, Shopper};
use crate::domain::ports::FilterSetStore;
use crate::error::{Result, StorageError};

struct StoredSet {
    set: FilterSet,
    usage: AtomicU64,
}

#[derive(Clone, Default)]
pub struct InMemoryFilterSetStore {
    sets: Arc<DashMap<Uuid, StoredSet>>,
    // (owner, lowercased name) -> id; the entry API makes the uniqueness check atomic
    names: Arc<DashMap<(Shopper, String), Uuid>>,
}

impl InMemoryFilterSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn materialize(stored: &StoredSet) -> FilterSet {
        let mut set = stored.set.clone();
        set.usage_count = stored.usage.load(Ordering::Acquire);
        set
    }
}

#[async_trait]
impl FilterSetStore for InMemoryFilterSetStore {
    async fn save(&self, filter_set: FilterSet) -> Result<()> {
        let key = (filter_set.owner.clone(), filter_set.name.trim().to_lowercase());
        match self.names.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StorageError::conflict(format!(
                "filter set '{}' already exists",
                filter_set.name
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(filter_set.id);
                self.sets.insert(
                    filter_set.id,
                    StoredSet {
                        usage: AtomicU64::new(filter_set.usage_count),
                        set: filter_set,
                    },
                );
                Ok(())
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<FilterSet>> {
        Ok(self.sets.get(&id).map(|s| Self::materialize(&s)))
    }

    async fn list(&self, owner: &Shopper) -> Result<Vec<FilterSet>> {
        let mut sets: Vec<FilterSet> = self
            .sets
            .iter()
            .filter(|s| &s.set.owner == owner)
            .map(|s| Self::materialize(&s))
            .collect();
        sets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sets)
    }

    async fn increment_usage(&self, id: Uuid) -> Result<u64> {
        let stored = self
            .sets
            .get(&id)
            .ok_or_else(|| StorageError::not_found("filter set", id))?;
        Ok(stored.usage.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_duplicate_name_conflicts_per_owner() {
        let store = InMemoryFilterSetStore::new();
        let me = Shopper::User(1);
        let other = Shopper::Session("s-1".into());

        store
            .save(FilterSet::new(me.clone(), "Summer", json!({"on_sale": true})))
            .await
            .unwrap();
        let err = store
            .save(FilterSet::new(me.clone(), "summer ", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        store
            .save(FilterSet::new(other.clone(), "Summer", json!({})))
            .await
            .unwrap();
        assert_eq!(store.list(&me).await.unwrap().len(), 1);
        assert_eq!(store.list(&other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_increment_usage() {
        let store = InMemoryFilterSetStore::new();
        let set = FilterSet::new(Shopper::User(1), "Cheap", json!({"price_max": 10}));
        let id = set.id;
        store.save(set).await.unwrap();

        assert_eq!(store.increment_usage(id).await.unwrap(), 1);
        assert_eq!(store.increment_usage(id).await.unwrap(), 2);
        assert_eq!(store.get(id).await.unwrap().unwrap().usage_count, 2);
        assert!(store
            .increment_usage(Uuid::new_v4())
            .await
            .unwrap_err()
            .is_not_found());
    }
}
