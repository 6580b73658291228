//! Error types for graph operations.

use thiserror::Error;

/// The error type for graph store and query operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The requested project id has never been ingested.
    #[error("project '{0}' not found in registry")]
    ProjectNotFound(String),

    /// An edge references a node that is not present. This is an internal
    /// invariant violation, never a user error; callers treat it as fatal.
    #[error("graph consistency violation: {0}")]
    Consistency(String),

    /// The persistence backend cannot be reached or rejected the operation.
    /// Propagated as-is; retry/backoff is the caller's responsibility.
    #[error("graph store unavailable: {0}")]
    StoreUnavailable(#[from] sled::Error),

    /// A stored record could not be encoded or decoded.
    #[error("record serialization failed: {0}")]
    Codec(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
