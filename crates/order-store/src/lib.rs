//! Persistence port for the order lifecycle.
//!
//! Stores plain records rather than domain aggregates. Every write goes
//! through a [`ChangeSet`], which is committed atomically with optimistic
//! version checks on each cart and order it touches.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use query::OrderQuery;
pub use record::{
    CART_STATUS_OPEN, CartItemRecord, CartRecord, OrderEventRecord, OrderLineRecord, OrderRecord,
    Version,
};
pub use store::{ChangeSet, ChangeSetValidationError, OrderStore, OrderStoreExt};
