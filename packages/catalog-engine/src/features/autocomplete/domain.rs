//! Autocomplete request/response shapes and the merge rules

use ahash::AHashMap;
use catalog_storage::{text, Shopper, SuggestionEntry, SuggestionKind, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::AutocompleteConfig;

/// Window of the popular-queries source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Day,
    #[default]
    Week,
    Month,
}

impl Timeframe {
    pub fn window(&self) -> Duration {
        match self {
            Timeframe::Day => Duration::days(1),
            Timeframe::Week => Duration::days(7),
            Timeframe::Month => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteRequest {
    pub query: String,
    /// Restrict to these kinds; `None` means all
    pub kinds: Option<Vec<SuggestionKind>>,
    pub limit: Option<usize>,
    pub user_id: Option<UserId>,
    pub session_id: Option<String>,
    pub include_trending: bool,
    pub include_personalized: bool,
    pub include_popular: bool,
    pub include_history: bool,
    pub timeframe: Timeframe,
}

impl Default for AutocompleteRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            kinds: None,
            limit: None,
            user_id: None,
            session_id: None,
            include_trending: true,
            include_personalized: true,
            include_popular: true,
            include_history: true,
            timeframe: Timeframe::default(),
        }
    }
}

impl AutocompleteRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = SuggestionKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// Only the fuzzy and synonym sources
    pub fn sources_off(mut self) -> Self {
        self.include_trending = false;
        self.include_personalized = false;
        self.include_popular = false;
        self.include_history = false;
        self
    }

    /// User id wins over session id
    pub fn shopper(&self) -> Option<Shopper> {
        match (self.user_id, &self.session_id) {
            (Some(id), _) => Some(Shopper::User(id)),
            (None, Some(s)) if !s.trim().is_empty() => Some(Shopper::Session(s.clone())),
            _ => None,
        }
    }

    pub fn normalized_query(&self) -> String {
        text::normalize(&self.query)
    }

    pub fn kind_filter(&self) -> Vec<SuggestionKind> {
        self.kinds.clone().unwrap_or_default()
    }

    pub fn wants(&self, kind: SuggestionKind) -> bool {
        self.kinds.as_ref().map_or(true, |k| k.is_empty() || k.contains(&kind))
    }

    /// 0 or absent means the default; anything else is capped at `max_limit`
    pub fn effective_limit(&self, config: &AutocompleteConfig) -> usize {
        match self.limit {
            None | Some(0) => config.default_limit,
            Some(n) => n.min(config.max_limit),
        }
    }
}

/// Which sources produced a suggestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFlags {
    pub trending: bool,
    pub popular: bool,
    pub history: bool,
    pub personalized: bool,
}

impl SourceFlags {
    pub const NONE: SourceFlags = SourceFlags {
        trending: false,
        popular: false,
        history: false,
        personalized: false,
    };
    pub const TRENDING: SourceFlags = SourceFlags { trending: true, ..Self::NONE };
    pub const POPULAR: SourceFlags = SourceFlags { popular: true, ..Self::NONE };
    pub const HISTORY: SourceFlags = SourceFlags { history: true, ..Self::NONE };
    pub const PERSONALIZED: SourceFlags = SourceFlags { personalized: true, ..Self::NONE };

    fn union(self, other: SourceFlags) -> SourceFlags {
        SourceFlags {
            trending: self.trending || other.trending,
            popular: self.popular || other.popular,
            history: self.history || other.history,
            personalized: self.personalized || other.personalized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub value: String,
    pub display: String,
    pub score: f64,
    pub priority: i32,
    #[serde(flatten)]
    pub flags: SourceFlags,
}

/// `0.4·searches + 0.3·clicks + 0.2·priority + 0.1·recency`
pub fn suggestion_score(entry: &SuggestionEntry, config: &AutocompleteConfig, now: DateTime<Utc>) -> f64 {
    let age = now - entry.updated_at;
    let recency = if age <= Duration::days(config.recent_days) {
        config.recent_bonus
    } else if age <= Duration::days(config.fresh_days) {
        config.fresh_bonus
    } else {
        0.0
    };
    let w = &config.weights;
    w.search_count * entry.search_count as f64
        + w.click_count * entry.click_count as f64
        + w.priority * entry.priority as f64
        + w.recency * recency
}

impl Suggestion {
    pub fn from_entry(
        entry: &SuggestionEntry,
        flags: SourceFlags,
        config: &AutocompleteConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: entry.kind,
            value: entry.value.clone(),
            display: entry.display.clone(),
            score: suggestion_score(entry, config, now),
            priority: entry.priority,
            flags,
        }
    }
}

/// Score desc, priority desc, then value for a stable order
fn by_rank(a: &Suggestion, b: &Suggestion) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.value.cmp(&b.value))
        .then_with(|| a.kind.cmp(&b.kind))
}

/// One suggestion per `(kind, normalized value)`: the highest score survives
/// and carries the union of every duplicate's flags. Output is ranked.
pub fn merge(candidates: impl IntoIterator<Item = Suggestion>) -> Vec<Suggestion> {
    let mut best: AHashMap<(SuggestionKind, String), Suggestion> = AHashMap::new();
    for candidate in candidates {
        let key = (candidate.kind, text::normalize(&candidate.value));
        match best.get_mut(&key) {
            Some(kept) => {
                let flags = kept.flags.union(candidate.flags);
                if by_rank(&candidate, kept) == Ordering::Less {
                    *kept = candidate;
                }
                kept.flags = flags;
            }
            None => {
                best.insert(key, candidate);
            }
        }
    }
    let mut merged: Vec<Suggestion> = best.into_values().collect();
    merged.sort_by(by_rank);
    merged
}

fn select(ranked: &[Suggestion], pred: impl Fn(&Suggestion) -> bool) -> Vec<Suggestion> {
    ranked.iter().filter(|s| pred(s)).cloned().collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub suggestions: Vec<Suggestion>,
    pub products: Vec<Suggestion>,
    pub categories: Vec<Suggestion>,
    pub brands: Vec<Suggestion>,
    pub queries: Vec<Suggestion>,
    pub trending: Vec<Suggestion>,
    pub popular: Vec<Suggestion>,
    pub history: Vec<Suggestion>,
    /// Distinct suggestions before truncation
    pub total: usize,
    pub has_more: bool,
    pub query_time_ms: u64,
}

impl AutocompleteResponse {
    /// Truncate a ranked list and group it for rendering
    pub fn assemble(mut ranked: Vec<Suggestion>, limit: usize) -> Self {
        let total = ranked.len();
        let has_more = total > limit;
        ranked.truncate(limit);

        Self {
            products: select(&ranked, |s| s.kind == SuggestionKind::Product),
            categories: select(&ranked, |s| s.kind == SuggestionKind::Category),
            brands: select(&ranked, |s| s.kind == SuggestionKind::Brand),
            queries: select(&ranked, |s| s.kind == SuggestionKind::Query),
            trending: select(&ranked, |s| s.flags.trending),
            popular: select(&ranked, |s| s.flags.popular),
            history: select(&ranked, |s| s.flags.history),
            suggestions: ranked,
            total,
            has_more,
            query_time_ms: 0,
        }
    }
}
