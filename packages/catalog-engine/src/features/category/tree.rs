//! Category arena
//!
//! Each category gets a stable `usize` slot; children are slot lists sorted by
//! `(sort_order, id)`. A tree is immutable once built: mutations build a new
//! tree and publish it as a fresh `Arc`.

use ahash::{AHashMap, AHashSet};
use catalog_storage::{Category, CategoryId};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::errors::{CatalogError, Result};

#[derive(Debug, Clone)]
pub struct CategoryTree {
    nodes: Vec<Category>,
    index: AHashMap<CategoryId, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    built_at: Option<Instant>,
}

impl CategoryTree {
    /// Placeholder published before the first load
    pub fn unloaded() -> Self {
        Self {
            nodes: Vec::new(),
            index: AHashMap::new(),
            children: Vec::new(),
            roots: Vec::new(),
            built_at: None,
        }
    }

    /// Build the arena. Structure is not validated here: cycles surface as
    /// `Integrity` errors on traversal.
    pub fn build(categories: Vec<Category>) -> Self {
        Self::build_as_of(categories, Instant::now())
    }

    /// Build from categories read no earlier than `loaded_at`
    pub fn build_as_of(mut categories: Vec<Category>, loaded_at: Instant) -> Self {
        categories.sort_by_key(|c| (c.sort_order, c.id));
        let index: AHashMap<CategoryId, usize> = categories
            .iter()
            .enumerate()
            .map(|(slot, c)| (c.id, slot))
            .collect();

        let mut children = vec![Vec::new(); categories.len()];
        let mut roots = Vec::new();
        for (slot, category) in categories.iter().enumerate() {
            match category.parent_id.and_then(|p| index.get(&p)) {
                Some(&parent) => children[parent].push(slot),
                None => roots.push(slot),
            }
        }

        Self {
            nodes: categories,
            index,
            children,
            roots,
            built_at: Some(loaded_at),
        }
    }

    pub fn built_at(&self) -> Option<Instant> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.index.get(&id).map(|&slot| &self.nodes[slot])
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.index.contains_key(&id)
    }

    /// Every category, in `(sort_order, id)` order
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Category> {
        self.roots.iter().map(|&slot| &self.nodes[slot])
    }

    fn slot(&self, id: CategoryId) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| CatalogError::not_found("category", id))
    }

    /// BFS from `start`; `active_only` stops at inactive children.
    /// A node reached twice means the parent pointers loop.
    fn walk(&self, start: usize, active_only: bool) -> Result<Vec<usize>> {
        let mut order = vec![start];
        let mut visited = AHashSet::new();
        visited.insert(start);
        let mut queue = VecDeque::from([start]);

        while let Some(slot) = queue.pop_front() {
            for &child in &self.children[slot] {
                if active_only && !self.nodes[child].is_active {
                    continue;
                }
                if !visited.insert(child) {
                    return Err(CatalogError::integrity(format!(
                        "category cycle through {} below {}",
                        self.nodes[child].id, self.nodes[start].id
                    )));
                }
                order.push(child);
                queue.push_back(child);
            }
        }
        Ok(order)
    }

    /// `id` and its active descendants, BFS order, `id` first
    pub fn descendants(&self, id: CategoryId) -> Result<Vec<CategoryId>> {
        let start = self.slot(id)?;
        Ok(self
            .walk(start, true)?
            .into_iter()
            .map(|slot| self.nodes[slot].id)
            .collect())
    }

    /// True when `node` sits anywhere below `ancestor` (active or not)
    pub fn is_below(&self, ancestor: CategoryId, node: CategoryId) -> Result<bool> {
        let start = self.slot(ancestor)?;
        Ok(self
            .walk(start, false)?
            .into_iter()
            .skip(1)
            .any(|slot| self.nodes[slot].id == node))
    }

    /// Root-first path ending at `id`
    pub fn path_to_root(&self, id: CategoryId) -> Result<Vec<Category>> {
        let mut slot = self.slot(id)?;
        let mut visited = AHashSet::new();
        let mut path = Vec::new();
        loop {
            if !visited.insert(slot) {
                return Err(CatalogError::integrity(format!(
                    "category cycle on the path of {}",
                    id
                )));
            }
            let node = &self.nodes[slot];
            path.push(node.clone());
            match node.parent_id.and_then(|p| self.index.get(&p)) {
                Some(&parent) => slot = parent,
                None => break,
            }
        }
        path.reverse();
        Ok(path)
    }

    /// Root-first path without `id` itself
    pub fn ancestors(&self, id: CategoryId) -> Result<Vec<Category>> {
        let mut path = self.path_to_root(id)?;
        path.pop();
        Ok(path)
    }

    /// Parent count = own count + rolled-up counts of active children.
    ///
    /// Computed bottom-up over the nodes reachable from a root; nodes
    /// unreachable from any root keep their direct count.
    pub fn rollup(&self, direct: &HashMap<CategoryId, u64>) -> HashMap<CategoryId, u64> {
        let mut totals: Vec<u64> = self
            .nodes
            .iter()
            .map(|c| direct.get(&c.id).copied().unwrap_or(0))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen = vec![false; self.nodes.len()];
        let mut queue: VecDeque<usize> = self.roots.iter().copied().collect();
        for &root in &self.roots {
            seen[root] = true;
        }
        while let Some(slot) = queue.pop_front() {
            order.push(slot);
            for &child in &self.children[slot] {
                if !seen[child] {
                    seen[child] = true;
                    queue.push_back(child);
                }
            }
        }

        for &slot in order.iter().rev() {
            let add: u64 = self.children[slot]
                .iter()
                .filter(|&&child| self.nodes[child].is_active)
                .map(|&child| totals[child])
                .sum();
            totals[slot] += add;
        }

        self.nodes
            .iter()
            .zip(totals)
            .map(|(c, total)| (c.id, total))
            .collect()
    }
}
