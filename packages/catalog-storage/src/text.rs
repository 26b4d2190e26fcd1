//! Text matching primitives
//!
//! Shared by the product store (predicate evaluation) and the engine's
//! relevance scorer, so "does it match" and "how well does it match" agree.
//!
//! - [`tokenize`]: Unicode letter/digit runs, lowercased
//! - [`trigram_similarity`]: padded word trigrams, Jaccard overlap (pg_trgm semantics)
//! - [`SearchDocument`]: tokenized name + body used for full-text match and rank

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// Letters and digits only; everything else separates tokens
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("static token pattern"));

/// Default similarity threshold (pg_trgm `similarity_threshold`)
pub const DEFAULT_TRIGRAM_THRESHOLD: f64 = 0.3;

/// Lowercased tokens of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Tokens joined by single spaces
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Case-insensitive containment on normalized forms
///
/// Empty needles never match.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    let needle = normalize(needle);
    if needle.is_empty() {
        return false;
    }
    normalize(haystack).contains(&needle)
}

/// Padded word trigrams: "cat" → {"  c", " ca", "cat", "at "}
pub fn trigrams(text: &str) -> HashSet<String> {
    let mut grams = HashSet::new();
    for word in tokenize(text) {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }
    grams
}

/// Trigram similarity in `0.0..=1.0`
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

/// Tokenized searchable text of one product
#[derive(Debug, Clone, Default)]
pub struct SearchDocument {
    /// Tokens of the product name (weight A)
    pub name_tokens: Vec<String>,
    /// Tokens of description, short description, sku and keywords (weight B)
    pub body_tokens: Vec<String>,
}

/// Rank contribution of a token found in the name
const NAME_WEIGHT: f64 = 1.0;
/// Rank contribution of a token found only in the body
const BODY_WEIGHT: f64 = 0.5;

impl SearchDocument {
    pub fn new<'a>(name: &str, body: impl IntoIterator<Item = &'a str>) -> Self {
        let mut body_tokens = Vec::new();
        for part in body {
            body_tokens.extend(tokenize(part));
        }
        Self {
            name_tokens: tokenize(name),
            body_tokens,
        }
    }

    fn name_has_prefix(&self, token: &str) -> bool {
        self.name_tokens.iter().any(|t| t.starts_with(token))
    }

    fn body_has_prefix(&self, token: &str) -> bool {
        self.body_tokens.iter().any(|t| t.starts_with(token))
    }

    /// Every query token appears (prefix match) somewhere in the document
    pub fn matches_all(&self, query_tokens: &[String]) -> bool {
        !query_tokens.is_empty()
            && query_tokens
                .iter()
                .all(|q| self.name_has_prefix(q) || self.body_has_prefix(q))
    }

    /// Mean per-token weight: name hits count 1.0, body-only hits 0.5
    pub fn rank(&self, query_tokens: &[String]) -> f64 {
        if query_tokens.is_empty() {
            return 0.0;
        }
        let total: f64 = query_tokens
            .iter()
            .map(|q| {
                if self.name_has_prefix(q) {
                    NAME_WEIGHT
                } else if self.body_has_prefix(q) {
                    BODY_WEIGHT
                } else {
                    0.0
                }
            })
            .sum();
        total / query_tokens.len() as f64
    }
}
