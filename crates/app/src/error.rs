//! Startup errors.

use order_store::StoreError;
use thiserror::Error;

/// Errors that stop the service from starting.
#[derive(Debug, Error)]
pub enum AppError {
    /// Tracing or metrics could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// The database could not be reached.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be prepared (e.g. migrations failed).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
