//! Common test utilities for catalog-engine
//!
//! Shared fixtures, builders and assertions for the integration tests.

mod assertions;
mod builders;
mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
