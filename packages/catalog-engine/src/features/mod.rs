//! Feature modules
//!
//! Leaf-first: `category` is used by `search` and `facets`; `recommendation`
//! and `autocomplete` are independent of the search path.

pub mod autocomplete;
pub mod category;
pub mod facets;
pub mod recommendation;
pub mod search;
