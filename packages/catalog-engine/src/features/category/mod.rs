//! Category hierarchy
//!
//! - [`CategoryTree`]: immutable arena with BFS traversal, path lookup and count rollup
//! - [`CategoryHierarchyResolver`]: publishes tree snapshots, validates writes

pub mod resolver;
pub mod tree;

pub use resolver::CategoryHierarchyResolver;
pub use tree::CategoryTree;
