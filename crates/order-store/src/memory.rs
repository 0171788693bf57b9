use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, UserRef};
use tokio::sync::RwLock;

use crate::{
    CartRecord, OrderEventRecord, OrderQuery, OrderRecord, Result, StoreError, Version,
    store::{ChangeSet, OrderStore},
};

#[derive(Debug, Default)]
struct MemoryState {
    carts: HashMap<CartId, CartRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    events: Vec<OrderEventRecord>,
    fail_on_commit: bool,
}

/// In-memory order store implementation for testing.
///
/// Commits run under a single write lock, so a change set is applied
/// atomically and version checks see a consistent snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to reject every commit until reset.
    pub async fn set_fail_on_commit(&self, fail: bool) {
        self.state.write().await.fail_on_commit = fail;
    }

    /// Returns the number of stored carts.
    pub async fn cart_count(&self) -> usize {
        self.state.read().await.carts.len()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of stored order events.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        changes
            .validate()
            .map_err(|e| StoreError::InvalidChangeSet(e.message))?;

        let mut state = self.state.write().await;

        if state.fail_on_commit {
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }

        // Check every version before touching anything
        for cart in changes.carts() {
            let actual = state
                .carts
                .get(&cart.id)
                .map(|c| c.version)
                .unwrap_or(Version::initial());
            if actual != cart.version {
                return Err(StoreError::ConcurrencyConflict {
                    entity: "cart",
                    id: cart.id.to_string(),
                    expected: cart.version,
                    actual,
                });
            }
        }
        for order in changes.orders() {
            let actual = state
                .orders
                .get(&order.id)
                .map(|o| o.version)
                .unwrap_or(Version::initial());
            if actual != order.version {
                return Err(StoreError::ConcurrencyConflict {
                    entity: "order",
                    id: order.id.to_string(),
                    expected: order.version,
                    actual,
                });
            }
        }

        for cart in changes.carts() {
            let mut stored = cart.clone();
            stored.version = cart.version.next();
            state.carts.insert(stored.id, stored);
        }
        for order in changes.orders() {
            let mut stored = order.clone();
            stored.version = order.version.next();
            // Lines are immutable once the order exists
            if let Some(existing) = state.orders.get(&order.id) {
                stored.lines = existing.lines.clone();
            }
            state.orders.insert(stored.id, stored);
        }
        state.events.extend(changes.events().iter().cloned());

        Ok(())
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>> {
        Ok(self.state.read().await.carts.get(&cart_id).cloned())
    }

    async fn find_open_cart(&self, user_ref: &UserRef) -> Result<Option<CartRecord>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .values()
            .filter(|c| &c.user_ref == user_ref && c.is_open())
            .min_by_key(|c| c.created_at)
            .cloned())
    }

    async fn find_cart_by_item(&self, item_id: CartItemId) -> Result<Option<CartRecord>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .values()
            .find(|c| c.items.iter().any(|i| i.id == item_id))
            .cloned())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| {
                if let Some(ref user) = query.user_ref
                    && &o.user_ref != user
                {
                    return false;
                }
                if let Some(ref status) = query.status
                    && !o.status.eq_ignore_ascii_case(status)
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_uuid().cmp(&a.id.as_uuid()))
        });

        let offset = query.offset.unwrap_or(0);
        let orders = orders.into_iter().skip(offset);
        let orders = match query.limit {
            Some(limit) => orders.take(limit).collect(),
            None => orders.collect(),
        };

        Ok(orders)
    }

    async fn get_order_events(&self, order_id: OrderId) -> Result<Vec<OrderEventRecord>> {
        let state = self.state.read().await;
        // Insertion order is commit order; the stable sort keeps it for ties
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }
}
