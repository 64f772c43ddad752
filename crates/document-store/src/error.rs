use thiserror::Error;
use uuid::Uuid;

use crate::Revision;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write expected a document revision that no longer matches.
    /// Nothing in the batch was applied.
    #[error(
        "Concurrency conflict on {collection}/{id}: expected revision {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        collection: String,
        id: Uuid,
        expected: Revision,
        actual: Revision,
    },

    /// The batch was rejected before touching storage.
    #[error("Invalid write batch: {0}")]
    InvalidBatch(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if this error is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
