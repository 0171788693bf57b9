use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, UserRef};

use crate::{CartRecord, OrderEventRecord, OrderQuery, OrderRecord, Result};

/// A set of writes committed as one atomic unit.
///
/// Each cart and order carries the version it was read at; the commit
/// fails with `ConcurrencyConflict` if any stored version differs, and
/// nothing in the set becomes visible. On success every written record is
/// stored at `version.next()`.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    carts: Vec<CartRecord>,
    orders: Vec<OrderRecord>,
    events: Vec<OrderEventRecord>,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cart write (insert when its version is initial, update otherwise).
    pub fn put_cart(mut self, cart: CartRecord) -> Self {
        self.carts.push(cart);
        self
    }

    /// Adds an order write (insert when its version is initial, update otherwise).
    pub fn put_order(mut self, order: OrderRecord) -> Self {
        self.orders.push(order);
        self
    }

    /// Appends order events. Each event's order must also be written in
    /// this change set.
    pub fn append_events(mut self, events: impl IntoIterator<Item = OrderEventRecord>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn carts(&self) -> &[CartRecord] {
        &self.carts
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    pub fn events(&self) -> &[OrderEventRecord] {
        &self.events
    }

    /// Returns true if the change set contains no writes.
    pub fn is_empty(&self) -> bool {
        self.carts.is_empty() && self.orders.is_empty() && self.events.is_empty()
    }

    /// Checks the change set is well formed before any write is attempted.
    pub fn validate(&self) -> std::result::Result<(), ChangeSetValidationError> {
        if self.is_empty() {
            return Err(ChangeSetValidationError {
                message: "Cannot commit an empty change set".to_string(),
            });
        }

        let mut cart_ids = HashSet::new();
        for cart in &self.carts {
            if !cart_ids.insert(cart.id) {
                return Err(ChangeSetValidationError {
                    message: format!("Cart {} is written more than once", cart.id),
                });
            }
        }

        let mut order_ids = HashSet::new();
        for order in &self.orders {
            if !order_ids.insert(order.id) {
                return Err(ChangeSetValidationError {
                    message: format!("Order {} is written more than once", order.id),
                });
            }
        }

        // Events are a byproduct of an order write, never written alone
        for event in &self.events {
            if !order_ids.contains(&event.order_id) {
                return Err(ChangeSetValidationError {
                    message: format!(
                        "Event {} references order {} which is not part of the change set",
                        event.id, event.order_id
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Error returned when a change set is malformed.
#[derive(Debug, Clone)]
pub struct ChangeSetValidationError {
    pub message: String,
}

impl std::fmt::Display for ChangeSetValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Change set validation error: {}", self.message)
    }
}

impl std::error::Error for ChangeSetValidationError {}

/// Core trait for order store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Reads return
/// committed state only.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Commits a change set atomically.
    ///
    /// Either every write in the set is applied or none is.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;

    /// Loads a cart together with all of its items.
    async fn get_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>>;

    /// Finds the open cart of a user. If several exist, the oldest wins.
    async fn find_open_cart(&self, user_ref: &UserRef) -> Result<Option<CartRecord>>;

    /// Loads the cart containing the given item.
    async fn find_cart_by_item(&self, item_id: CartItemId) -> Result<Option<CartRecord>>;

    /// Loads an order together with its lines.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists orders matching a query, newest first.
    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>>;

    /// Returns the events of an order, oldest first.
    async fn get_order_events(&self, order_id: OrderId) -> Result<Vec<OrderEventRecord>>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        (**self).commit(changes).await
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>> {
        (**self).get_cart(cart_id).await
    }

    async fn find_open_cart(&self, user_ref: &UserRef) -> Result<Option<CartRecord>> {
        (**self).find_open_cart(user_ref).await
    }

    async fn find_cart_by_item(&self, item_id: CartItemId) -> Result<Option<CartRecord>> {
        (**self).find_cart_by_item(item_id).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        (**self).get_order(order_id).await
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        (**self).query_orders(query).await
    }

    async fn get_order_events(&self, order_id: OrderId) -> Result<Vec<OrderEventRecord>> {
        (**self).get_order_events(order_id).await
    }
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Commits a single cart write.
    async fn save_cart(&self, cart: CartRecord) -> Result<()> {
        self.commit(ChangeSet::new().put_cart(cart)).await
    }

    /// Commits an order write together with the events it produced.
    async fn save_order(&self, order: OrderRecord, events: Vec<OrderEventRecord>) -> Result<()> {
        self.commit(ChangeSet::new().put_order(order).append_events(events))
            .await
    }

    /// Checks if an order exists.
    async fn order_exists(&self, order_id: OrderId) -> Result<bool> {
        Ok(self.get_order(order_id).await?.is_some())
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}
