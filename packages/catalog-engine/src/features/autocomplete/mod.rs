//! Search-box suggestions merged from six sources

pub mod domain;
pub mod service;

pub use domain::{
    AutocompleteRequest, AutocompleteResponse, SourceFlags, Suggestion, Timeframe,
};
pub use service::AutocompleteService;
