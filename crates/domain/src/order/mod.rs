//! Order aggregate and related types.

mod aggregate;
mod events;
mod service;
mod status;
mod value_objects;

pub use aggregate::{Order, OrderDetails};
pub use events::OrderStatusChanged;
pub use service::{CreateOrder, NewOrderLine, OrderLifecycleService};
pub use status::{OrderStatus, UnknownStatus};
pub use value_objects::{Money, OrderLine};

use thiserror::Error;

/// Errors that can occur during order transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The status machine has no edge between the two statuses.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
