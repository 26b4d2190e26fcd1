//! Error types for catalog-engine
//!
//! Degraded-but-available states (a facet dimension that timed out, an empty
//! recommendation cache) are successful responses and never appear here.

use catalog_storage::{ErrorKind, StorageError};
use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for catalog-engine operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Unknown category, product or filter set
    #[error("Not found: {0}")]
    NotFound(String),

    /// Self-contradictory or out-of-range filter, rejected before execution
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Category tree cycle or self-parent
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// The main ranked query exceeded the request deadline
    #[error("Computation timed out after {elapsed_ms}ms: {operation}")]
    ComputationTimeout { operation: String, elapsed_ms: u64 },

    /// Natural key already taken (e.g. filter-set name per owner)
    #[error("Duplicate association: {0}")]
    DuplicateAssociation(String),

    /// Batch recomputation could not run (worker pool, joined task)
    #[error("Batch job failed: {0}")]
    Batch(String),

    /// Storage failure without a more specific mapping
    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl CatalogError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        CatalogError::NotFound(format!("{} {}", entity, id))
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        CatalogError::InvalidFilter(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        CatalogError::Integrity(msg.into())
    }

    pub fn timeout(operation: impl Into<String>, elapsed: std::time::Duration) -> Self {
        CatalogError::ComputationTimeout {
            operation: operation.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "not_found",
            CatalogError::InvalidFilter(_) => "invalid_filter",
            CatalogError::Integrity(_) => "integrity",
            CatalogError::ComputationTimeout { .. } => "computation_timeout",
            CatalogError::DuplicateAssociation(_) => "duplicate_association",
            CatalogError::Batch(_) => "batch",
            CatalogError::Storage(_) => "storage",
            CatalogError::Config(_) => "config",
            CatalogError::Metrics(_) => "metrics",
        }
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        match err.kind {
            ErrorKind::NotFound => CatalogError::NotFound(err.message),
            ErrorKind::Conflict => CatalogError::DuplicateAssociation(err.message),
            ErrorKind::Timeout => CatalogError::ComputationTimeout {
                operation: err.message,
                elapsed_ms: 0,
            },
            ErrorKind::Integrity => CatalogError::Integrity(err.message),
            _ => CatalogError::Storage(err),
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, CatalogError>;
