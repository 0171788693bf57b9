//! Shared types used across the order lifecycle crates.
//!
//! - Strongly typed identifiers for carts, cart items, orders and events
//! - The opaque [`UserRef`] owner reference
//! - Descriptive order details (shipping, payment method, contact)

mod details;
mod types;

pub use details::{CustomerContact, PaymentMethod, ShippingAddress};
pub use types::{CartId, CartItemId, EventId, OrderId, UserRef};
