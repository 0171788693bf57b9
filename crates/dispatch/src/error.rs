//! Collaborator error types.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by collaborator calls.
///
/// These never reach the caller of a lifecycle operation; the worker logs
/// them and moves on.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The call did not finish within the configured timeout.
    #[error("{effect} timed out after {after:?}")]
    Timeout {
        effect: &'static str,
        after: Duration,
    },

    /// Stock service error.
    #[error("Stock service error: {0}")]
    StockService(String),

    /// Notification service error.
    #[error("Notification service error: {0}")]
    NotificationService(String),

    /// Payment service error.
    #[error("Payment service error: {0}")]
    PaymentService(String),
}
