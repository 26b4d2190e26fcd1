//! Product recommendations
//!
//! - `domain/`: strategies, result shapes and the pure scoring rules
//! - `application/`: cache-then-live `RecommendationEngine` and the batch
//!   jobs that maintain its tables

pub mod application;
pub mod domain;

pub use application::{BatchReport, RecommendationBatch, RecommendationEngine};
pub use domain::{Affinity, Recommendation, Recommendations, Source, Strategy};
