//! In-memory suggestion entries, analytics log and shopper preferences
//!
//! Suggestion counters are `AtomicU64`s inside `DashMap` slots: concurrent
//! increments on the same entry never lose an update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::models::{
    HistoryEntry, QueryPopularity, SearchEvent, Shopper, SuggestionEntry, SuggestionKind, UserId,
};
use crate::domain::ports::{AnalyticsRecorder, PreferenceStore, SuggestionStore};
use crate::error::Result;
use crate::text;

// ═══════════════════════════════════════════════════════════════════════════
// Suggestions
// ═══════════════════════════════════════════════════════════════════════════

type SlotKey = (SuggestionKind, String);

struct Slot {
    entry: RwLock<SuggestionEntry>,
    search_count: AtomicU64,
    click_count: AtomicU64,
}

impl Slot {
    fn new(entry: SuggestionEntry) -> Self {
        Self {
            search_count: AtomicU64::new(entry.search_count),
            click_count: AtomicU64::new(entry.click_count),
            entry: RwLock::new(entry),
        }
    }

    fn snapshot(&self) -> SuggestionEntry {
        let mut entry = self.entry.read().clone();
        entry.search_count = self.search_count.load(Ordering::Acquire);
        entry.click_count = self.click_count.load(Ordering::Acquire);
        entry
    }

    fn touch(&self) {
        self.entry.write().updated_at = Utc::now();
    }
}

fn slot_key(kind: SuggestionKind, value: &str) -> SlotKey {
    (kind, text::normalize(value))
}

#[derive(Clone, Default)]
pub struct InMemorySuggestionStore {
    slots: Arc<DashMap<SlotKey, Slot>>,
}

impl InMemorySuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = SuggestionEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store
                .slots
                .insert(slot_key(entry.kind, &entry.value), Slot::new(entry));
        }
        store
    }

    fn collect(
        &self,
        kinds: &[SuggestionKind],
        pred: impl Fn(&str, &SuggestionEntry) -> bool,
    ) -> Vec<SuggestionEntry> {
        let mut hits: Vec<SuggestionEntry> = self
            .slots
            .iter()
            .filter(|slot| kinds.is_empty() || kinds.contains(&slot.key().0))
            .filter_map(|slot| {
                let entry = slot.value().snapshot();
                pred(&slot.key().1, &entry).then_some(entry)
            })
            .collect();
        hits.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then_with(|| a.value.cmp(&b.value))
        });
        hits
    }

    fn bump(&self, kind: SuggestionKind, value: &str, pick: fn(&Slot) -> &AtomicU64) -> u64 {
        let key = slot_key(kind, value);
        if let Some(slot) = self.slots.get(&key) {
            let count = pick(&slot).fetch_add(1, Ordering::AcqRel) + 1;
            slot.touch();
            return count;
        }
        let slot = self
            .slots
            .entry(key)
            .or_insert_with(|| Slot::new(SuggestionEntry::new(kind, value.trim())));
        let count = pick(&slot).fetch_add(1, Ordering::AcqRel) + 1;
        slot.touch();
        count
    }
}

#[async_trait]
impl SuggestionStore for InMemorySuggestionStore {
    async fn get(&self, kind: SuggestionKind, value: &str) -> Result<Option<SuggestionEntry>> {
        Ok(self
            .slots
            .get(&slot_key(kind, value))
            .map(|slot| slot.snapshot()))
    }

    async fn upsert(&self, entry: SuggestionEntry) -> Result<()> {
        self.slots
            .insert(slot_key(entry.kind, &entry.value), Slot::new(entry));
        Ok(())
    }

    async fn increment_search(&self, kind: SuggestionKind, value: &str) -> Result<u64> {
        Ok(self.bump(kind, value, |slot| &slot.search_count))
    }

    async fn increment_click(&self, kind: SuggestionKind, value: &str) -> Result<u64> {
        Ok(self.bump(kind, value, |slot| &slot.click_count))
    }

    async fn search(
        &self,
        query: &str,
        kinds: &[SuggestionKind],
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<SuggestionEntry>> {
        let needle = text::normalize(query);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits = self.collect(kinds, |value, _| {
            value.starts_with(&needle)
                || value.contains(&needle)
                || text::trigram_similarity(value, &needle) >= min_similarity
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn by_synonym(
        &self,
        query: &str,
        kinds: &[SuggestionKind],
        limit: usize,
    ) -> Result<Vec<SuggestionEntry>> {
        let needle = text::normalize(query);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits = self.collect(kinds, |_, entry| {
            entry
                .synonyms
                .iter()
                .any(|s| text::normalize(s).starts_with(&needle))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn by_values(
        &self,
        values: &[String],
        kinds: &[SuggestionKind],
    ) -> Result<Vec<SuggestionEntry>> {
        let wanted: HashSet<String> = values.iter().map(|v| text::normalize(v)).collect();
        Ok(self.collect(kinds, |value, _| wanted.contains(value)))
    }

    async fn trending(
        &self,
        kinds: &[SuggestionKind],
        limit: usize,
    ) -> Result<Vec<SuggestionEntry>> {
        let mut hits = self.collect(kinds, |_, entry| entry.is_trending);
        hits.truncate(limit);
        Ok(hits)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Analytics
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct ClickEvent {
    kind: SuggestionKind,
    value: String,
    shopper: Option<Shopper>,
    timestamp: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct InMemoryAnalyticsRecorder {
    searches: Arc<RwLock<Vec<SearchEvent>>>,
    clicks: Arc<RwLock<Vec<ClickEvent>>>,
}

impl InMemoryAnalyticsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_events(&self) -> Vec<SearchEvent> {
        self.searches.read().clone()
    }

    pub fn click_count(&self, kind: SuggestionKind, value: &str) -> usize {
        let needle = text::normalize(value);
        self.clicks
            .read()
            .iter()
            .filter(|c| c.kind == kind && text::normalize(&c.value) == needle)
            .count()
    }

    /// Clicks recorded for `shopper` at or after `since`
    pub fn clicks_by(&self, shopper: &Shopper, since: DateTime<Utc>) -> usize {
        self.clicks
            .read()
            .iter()
            .filter(|c| c.shopper.as_ref() == Some(shopper) && c.timestamp >= since)
            .count()
    }
}

#[async_trait]
impl AnalyticsRecorder for InMemoryAnalyticsRecorder {
    async fn record_search(&self, event: SearchEvent) -> Result<()> {
        self.searches.write().push(event);
        Ok(())
    }

    async fn record_click(
        &self,
        kind: SuggestionKind,
        value: &str,
        shopper: Option<&Shopper>,
    ) -> Result<()> {
        self.clicks.write().push(ClickEvent {
            kind,
            value: value.to_string(),
            shopper: shopper.cloned(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn popular_queries(
        &self,
        since: DateTime<Utc>,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<QueryPopularity>> {
        let prefix = text::normalize(prefix);
        let mut by_query: HashMap<String, QueryPopularity> = HashMap::new();
        for event in self.searches.read().iter() {
            if event.timestamp < since {
                continue;
            }
            let query = text::normalize(&event.query);
            if query.is_empty() || !query.starts_with(&prefix) {
                continue;
            }
            let slot = by_query
                .entry(query.clone())
                .or_insert_with(|| QueryPopularity {
                    query,
                    count: 0,
                    last_searched: event.timestamp,
                });
            slot.count += 1;
            slot.last_searched = slot.last_searched.max(event.timestamp);
        }
        let mut popular: Vec<QueryPopularity> = by_query.into_values().collect();
        popular.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        popular.truncate(limit);
        Ok(popular)
    }

    async fn history(
        &self,
        shopper: &Shopper,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let prefix = text::normalize(prefix);
        let searches = self.searches.read();
        let mut seen = HashSet::new();
        let mut history = Vec::new();
        let mut mine: Vec<&SearchEvent> = searches
            .iter()
            .filter(|e| e.shopper.as_ref() == Some(shopper))
            .collect();
        mine.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        for event in mine {
            let query = text::normalize(&event.query);
            if query.is_empty() || !query.starts_with(&prefix) || !seen.insert(query.clone()) {
                continue;
            }
            history.push(HistoryEntry {
                query,
                searched_at: event.timestamp,
            });
            if history.len() == limit {
                break;
            }
        }
        Ok(history)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Preferences
// ═══════════════════════════════════════════════════════════════════════════

/// Personalization opt-outs; users are opted in unless set otherwise
#[derive(Clone, Default)]
pub struct InMemoryPreferenceStore {
    personalization: Arc<DashMap<UserId, bool>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_personalization(&self, user_id: UserId, enabled: bool) {
        self.personalization.insert(user_id, enabled);
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn personalization_enabled(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .personalization
            .get(&user_id)
            .map_or(true, |enabled| *enabled))
    }
}
