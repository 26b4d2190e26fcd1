pub mod model;
pub mod scoring;

pub use model::{Recommendation, Recommendations, Source, Strategy};
pub use scoring::{co_occurrence, content_similarity, related_score, trend_scores, Affinity};
