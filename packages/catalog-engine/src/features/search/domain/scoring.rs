//! Relevance scoring
//!
//! A pure function of product, query, weights and clock; no store access.

use catalog_storage::{text, Product, TextQuery};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

use crate::config::RelevanceWeights;

/// Signals that contributed to a score, kept for debugging ranked output
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub full_text: f64,
    pub name_substring: f64,
    pub sku_substring: f64,
    pub trigram_name: f64,
    pub featured: f64,
    pub in_stock: f64,
    pub new_arrival: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.full_text
            + self.name_substring
            + self.sku_substring
            + self.trigram_name
            + self.featured
            + self.in_stock
            + self.new_arrival
    }
}

pub struct RelevanceScorer<'a> {
    pub weights: &'a RelevanceWeights,
    pub new_arrival_window: Duration,
    pub now: DateTime<Utc>,
}

impl<'a> RelevanceScorer<'a> {
    pub fn breakdown(&self, product: &Product, query: Option<&TextQuery>) -> ScoreBreakdown {
        let w = self.weights;
        let mut score = ScoreBreakdown::default();

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            score.full_text = w.full_text * product.search_document().rank(&query.tokens);
            if text::contains_normalized(&product.name, &query.normalized) {
                score.name_substring = w.name_substring;
            }
            if text::contains_normalized(&product.sku, &query.normalized) {
                score.sku_substring = w.sku_substring;
            }
            score.trigram_name =
                w.trigram_name * text::trigram_similarity(&query.normalized, &product.name);
        }

        if product.featured {
            score.featured = w.featured;
        }
        if product.is_in_stock() {
            score.in_stock = w.in_stock;
        }
        if product.created_at >= self.now - self.new_arrival_window {
            score.new_arrival = w.new_arrival;
        }
        score
    }

    pub fn score(&self, product: &Product, query: Option<&TextQuery>) -> f64 {
        self.breakdown(product, query).total()
    }

    /// Score and order: score desc, then `created_at` desc, then id asc
    pub fn rank(&self, products: Vec<Product>, query: Option<&TextQuery>) -> Vec<(Product, f64)> {
        let mut scored: Vec<(Product, f64)> = products
            .into_iter()
            .map(|p| {
                let s = self.score(&p, query);
                (p, s)
            })
            .collect();
        scored.sort_by(|(a, sa), (b, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        scored
    }
}
