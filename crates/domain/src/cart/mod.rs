//! Shopping cart aggregate and service.

mod aggregate;
mod service;

pub use aggregate::{Cart, CartItem, CartStatus};
pub use service::{CartService, NewCartItem};

use common::{CartId, CartItemId};
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The cart was already checked out.
    #[error("Cart {cart_id} is not open")]
    Closed { cart_id: CartId },

    /// Quantities must be at least one.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: i32 },

    /// Unit prices cannot be negative.
    #[error("Invalid unit price: {cents} cents")]
    InvalidPrice { cents: i64 },

    /// The item is not in the cart.
    #[error("Cart item not found: {item_id}")]
    ItemNotFound { item_id: CartItemId },

    /// The cart has no items.
    #[error("Cart {cart_id} is empty")]
    Empty { cart_id: CartId },

    /// A cart holds items of a single currency.
    #[error("Currency mismatch: cart uses {expected}, item uses {found}")]
    MixedCurrency { expected: String, found: String },

    /// The quantity or total does not fit the integer range.
    #[error("Cart total overflows")]
    TotalOverflow,
}
