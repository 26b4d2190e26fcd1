pub mod engine;
pub mod filter_sets;

pub use engine::SearchQueryEngine;
pub use filter_sets::FilterSetService;
