//! In-memory category and taxonomy tables
//!
//! The category store does not validate tree structure; that is the
//! resolver's job before it writes.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::models::{Attribute, Brand, Category, CategoryId, Tag};
use crate::domain::ports::{CategoryStore, TaxonomyStore};
use crate::error::Result;

#[derive(Clone, Default)]
pub struct InMemoryCategoryStore {
    nodes: Arc<RwLock<BTreeMap<CategoryId, Category>>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let store = Self::new();
        {
            let mut nodes = store.nodes.write();
            for category in categories {
                nodes.insert(category.id, category);
            }
        }
        store
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn get_node(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.nodes.read().get(&id).cloned())
    }

    async fn get_children(&self, id: CategoryId) -> Result<Vec<Category>> {
        let mut children: Vec<Category> = self
            .nodes
            .read()
            .values()
            .filter(|c| c.parent_id == Some(id))
            .cloned()
            .collect();
        children.sort_by_key(|c| (c.sort_order, c.id));
        Ok(children)
    }

    async fn list_all(&self) -> Result<Vec<Category>> {
        Ok(self.nodes.read().values().cloned().collect())
    }

    async fn upsert(&self, category: Category) -> Result<()> {
        self.nodes.write().insert(category.id, category);
        Ok(())
    }
}

/// Brands, tags and attributes
#[derive(Clone, Default)]
pub struct InMemoryTaxonomyStore {
    brands: Arc<RwLock<Vec<Brand>>>,
    tags: Arc<RwLock<Vec<Tag>>>,
    attributes: Arc<RwLock<Vec<Attribute>>>,
}

impl InMemoryTaxonomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_brand(&self, brand: Brand) {
        let mut brands = self.brands.write();
        brands.retain(|b| b.id != brand.id);
        brands.push(brand);
    }

    pub fn insert_tag(&self, tag: Tag) {
        let mut tags = self.tags.write();
        tags.retain(|t| t.id != tag.id);
        tags.push(tag);
    }

    pub fn insert_attribute(&self, attribute: Attribute) {
        let mut attributes = self.attributes.write();
        attributes.retain(|a| a.id != attribute.id);
        attributes.push(attribute);
    }
}

#[async_trait]
impl TaxonomyStore for InMemoryTaxonomyStore {
    async fn list_brands(&self) -> Result<Vec<Brand>> {
        let mut brands = self.brands.read().clone();
        brands.sort_by_key(|b| b.id);
        Ok(brands)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.tags.read().clone();
        tags.sort_by_key(|t| t.id);
        Ok(tags)
    }

    async fn list_attributes(&self) -> Result<Vec<Attribute>> {
        let mut attributes = self.attributes.read().clone();
        attributes.sort_by_key(|a| a.id);
        Ok(attributes)
    }
}
