pub mod batch;
pub mod engine;

pub use batch::{BatchReport, RecommendationBatch};
pub use engine::RecommendationEngine;
