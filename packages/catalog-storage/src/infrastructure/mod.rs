//! Infrastructure layer - store adapters
//!
//! `memory`: process-local adapters for every port. Used by tests and by
//! callers embedding the engine without an external database.

pub mod memory;
