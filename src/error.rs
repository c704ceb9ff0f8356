/// Error types for the feed composition engine
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Request rejected before any retrieval (e.g. unrecognized sort token).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Data-store failure. Propagated unchanged; retry policy belongs to the
    /// store collaborator, not this crate.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AppError>;
