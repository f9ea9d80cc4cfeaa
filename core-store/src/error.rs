//! Error types for the store crate

use thiserror::Error;

/// Errors raised by the persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The cache backend cannot be reached; callers should fall back to
    /// the underlying source rather than fail the request
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound {
        /// Type of entity (e.g., "Track", "Lyrics")
        entity_type: String,
        /// Entity identifier
        id: String,
    },

    /// Invalid input data
    #[error("Invalid {field}: {message}")]
    InvalidInput {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored payload could not be decoded
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the error means the backend itself is down, as opposed to a
    /// per-row failure. Drives the cache-miss fallback in callers.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
