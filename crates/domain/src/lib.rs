//! Order lifecycle domain.
//!
//! This crate provides:
//! - The order status machine and the order aggregate with its events
//! - The cart aggregate and [`CartService`]
//! - [`CheckoutService`], turning a cart into an order atomically
//! - [`OrderLifecycleService`], driving orders after creation
//!
//! Side effects (stock, notifications) are handed to a
//! [`dispatch::Dispatcher`] after each commit and never affect the outcome
//! of the operation that queued them.

pub mod cart;
pub mod checkout;
mod effects;
pub mod error;
pub mod order;

pub use cart::{Cart, CartError, CartItem, CartService, CartStatus, NewCartItem};
pub use checkout::CheckoutService;
pub use error::{DomainError, ErrorKind};
pub use order::{
    CreateOrder, Money, NewOrderLine, Order, OrderDetails, OrderError, OrderLifecycleService,
    OrderLine, OrderStatus, OrderStatusChanged, UnknownStatus,
};
