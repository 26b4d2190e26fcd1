pub mod request;
pub mod scoring;
pub mod synonyms;

pub use request::{AttributeFilter, SearchRequest, SearchResponse};
pub use scoring::{RelevanceScorer, ScoreBreakdown};
pub use synonyms::SynonymIndex;
