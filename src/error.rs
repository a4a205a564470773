//! Error types shared across the storage port and the embedding pipeline.
//!
//! Storage errors are always fatal to the enclosing operation. Embedding
//! errors are recoverable: callers downgrade them to "no embedding" or
//! "section omitted" rather than aborting.

use thiserror::Error;

/// Result type for storage port operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors raised by a [`crate::storage::MemoryStore`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

/// Errors raised while generating an embedding.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("failed to decode embedding response: {0}")]
    Decode(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    Dimensions { expected: usize, actual: usize },
}

/// Error for operations that touch both storage and the embedding provider.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}
