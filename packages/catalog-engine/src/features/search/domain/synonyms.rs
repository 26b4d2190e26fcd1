//! Synonym groups for query expansion

use ahash::AHashMap;
use catalog_storage::text;
use std::collections::BTreeSet;

/// Term → other members of every group the term belongs to
#[derive(Debug, Clone, Default)]
pub struct SynonymIndex {
    members: AHashMap<String, BTreeSet<String>>,
}

impl SynonymIndex {
    pub fn new(groups: &[Vec<String>]) -> Self {
        let mut members: AHashMap<String, BTreeSet<String>> = AHashMap::new();
        for group in groups {
            let normalized: Vec<String> = group
                .iter()
                .map(|t| text::normalize(t))
                .filter(|t| !t.is_empty())
                .collect();
            for term in &normalized {
                let others = members.entry(term.clone()).or_default();
                others.extend(normalized.iter().filter(|o| *o != term).cloned());
            }
        }
        Self { members }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Alternatives for a query: group members of the whole normalized query
    /// and of each of its tokens, sorted
    pub fn expand(&self, query: &str) -> Vec<String> {
        let normalized = text::normalize(query);
        let mut out = BTreeSet::new();
        if let Some(others) = self.members.get(&normalized) {
            out.extend(others.iter().cloned());
        }
        for token in text::tokenize(query) {
            if let Some(others) = self.members.get(&token) {
                out.extend(others.iter().cloned());
            }
        }
        out.remove(&normalized);
        out.into_iter().collect()
    }
}
