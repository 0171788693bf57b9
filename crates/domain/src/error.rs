//! Domain error types.

use common::UserRef;
use order_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::cart::CartError;
use crate::order::{OrderError, UnknownStatus};

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A cart, cart item or order does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requesting user does not own the entity.
    #[error("User {user} is not allowed to access {entity} {id}")]
    Unauthorized {
        user: UserRef,
        entity: &'static str,
        id: String,
    },

    /// The entity is in the wrong lifecycle stage for the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The payment authority declined or could not process the charge.
    #[error("Payment of {amount} declined for user {user}")]
    PaymentDeclined { user: UserRef, amount: Decimal },

    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the cart aggregate.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// An error occurred in the order store.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored status is not recognised.
    #[error("Unknown stored status: {0}")]
    UnknownStatus(String),
}

impl From<UnknownStatus> for DomainError {
    fn from(e: UnknownStatus) -> Self {
        DomainError::UnknownStatus(e.0)
    }
}

/// Classification of a [`DomainError`] for callers.
///
/// Every kind except `Conflict` and `Fatal` is the caller's to fix.
/// `Conflict` means a concurrent writer won and the operation may be
/// retried. `Fatal` means the system itself is broken or unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidState,
    InvalidTransition,
    InvalidArgument,
    Conflict,
    Fatal,
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn unauthorized(user: &UserRef, entity: &'static str, id: impl ToString) -> Self {
        DomainError::Unauthorized {
            user: user.clone(),
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Unauthorized { .. } => ErrorKind::Unauthorized,
            DomainError::InvalidState(_) | DomainError::PaymentDeclined { .. } => {
                ErrorKind::InvalidState
            }
            DomainError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            DomainError::Order(OrderError::InvalidTransition { .. }) => {
                ErrorKind::InvalidTransition
            }
            DomainError::Cart(e) => match e {
                CartError::Closed { .. } | CartError::Empty { .. } => ErrorKind::InvalidState,
                CartError::ItemNotFound { .. } => ErrorKind::NotFound,
                CartError::InvalidQuantity { .. }
                | CartError::InvalidPrice { .. }
                | CartError::MixedCurrency { .. }
                | CartError::TotalOverflow => ErrorKind::InvalidArgument,
            },
            DomainError::Store(StoreError::ConcurrencyConflict { .. }) => ErrorKind::Conflict,
            DomainError::Store(_)
            | DomainError::Serialization(_)
            | DomainError::UnknownStatus(_) => ErrorKind::Fatal,
        }
    }

    /// Returns true for errors the caller cannot fix by changing the request.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}
