use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record was modified by someone else since it was read.
    /// The whole change set was rejected.
    #[error(
        "Concurrency conflict for {entity} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        entity: &'static str,
        id: String,
        expected: Version,
        actual: Version,
    },

    /// The change set is malformed.
    #[error("Invalid change set: {0}")]
    InvalidChangeSet(String),

    /// The store could not be reached or refused the write.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

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

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
