//! Ranked product search
//!
//! - `domain/`: request/response shapes, validation, relevance scoring, synonyms
//! - `application/`: `SearchQueryEngine` and saved filter sets

pub mod application;
pub mod domain;

pub use application::{FilterSetService, SearchQueryEngine};
pub use domain::{
    AttributeFilter, RelevanceScorer, ScoreBreakdown, SearchRequest, SearchResponse, SynonymIndex,
};
