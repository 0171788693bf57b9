//! Order lifecycle service.

use common::{OrderId, UserRef};
use dispatch::{AuthToken, Dispatcher};
use order_store::{ChangeSet, OrderQuery, OrderStore, OrderStoreExt};
use rust_decimal::Decimal;

use crate::effects;
use crate::error::DomainError;

use super::{Money, Order, OrderDetails, OrderLine, OrderStatus, OrderStatusChanged};

/// Currency used when an order does not name one.
const DEFAULT_CURRENCY: &str = "USD";

/// A line of a directly created order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub product_ref: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    /// Unit price in major units.
    pub unit_price: Decimal,
}

/// Input of [`OrderLifecycleService::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateOrder {
    /// Owner reference. Preferred over `user_id` when both are set.
    pub user_ref: Option<String>,
    /// Numeric owner id, used when no reference is given.
    pub user_id: Option<i64>,
    /// Total in major units.
    pub total: Decimal,
    pub currency: Option<String>,
    pub details: OrderDetails,
    pub lines: Vec<NewOrderLine>,
    /// When present, an order confirmation is sent.
    pub auth_token: Option<AuthToken>,
}

impl CreateOrder {
    fn owner(&self) -> Result<UserRef, DomainError> {
        if let Some(user_ref) = self.user_ref.as_deref().map(str::trim)
            && !user_ref.is_empty()
        {
            return Ok(UserRef::new(user_ref));
        }
        match self.user_id {
            Some(id) => Ok(UserRef::new(id.to_string())),
            None => Err(DomainError::InvalidArgument(
                "either user reference or user id is required".to_string(),
            )),
        }
    }
}

fn to_money(amount: Decimal, what: &str) -> Result<Money, DomainError> {
    let money = Money::from_decimal(amount)
        .ok_or_else(|| DomainError::InvalidArgument(format!("{what} {amount} is out of range")))?;
    if money.is_negative() {
        return Err(DomainError::InvalidArgument(format!(
            "{what} {amount} is negative"
        )));
    }
    Ok(money)
}

/// Service driving orders through their lifecycle after creation.
///
/// Each transition is one atomic write of the order row and its new event,
/// guarded by the version that was read. Side effects are queued only
/// after that write commits.
pub struct OrderLifecycleService<S: OrderStore> {
    store: S,
    dispatcher: Dispatcher,
}

impl<S: OrderStore> OrderLifecycleService<S> {
    pub fn new(store: S, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Creates a PENDING order directly, outside checkout.
    ///
    /// Lines take stock the same way a checkout does, so a later
    /// cancellation or refund returns exactly what was taken.
    #[tracing::instrument(skip(self, request), fields(user_ref = ?request.user_ref, user_id = ?request.user_id))]
    pub async fn create(&self, request: CreateOrder) -> Result<Order, DomainError> {
        let user = request.owner()?;
        let total = to_money(request.total, "total")?;
        let currency = request
            .currency
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let lines = request
            .lines
            .iter()
            .map(|line| {
                if line.quantity < 1 {
                    return Err(DomainError::InvalidArgument(format!(
                        "quantity of {} must be at least 1",
                        line.product_ref
                    )));
                }
                Ok(OrderLine {
                    product_ref: line.product_ref.clone(),
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price: to_money(line.unit_price, "unit price")?,
                    currency: currency.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut order = Order::new(user, total, currency, lines, request.details);
        self.store.save_order(order.to_record(), vec![]).await?;
        order.mark_persisted();

        tracing::info!(order_id = %order.id(), total = %order.total(), "Order created");
        metrics::counter!("orders_created_total").increment(1);

        self.dispatcher
            .dispatch_all(effects::stock_adjustments(&order, -1, "placed"));
        if let Some(auth_token) = &request.auth_token {
            self.dispatcher
                .dispatch(effects::order_confirmation(&order, auth_token));
        }
        Ok(order)
    }

    /// Moves an order to `target` and persists the transition.
    #[tracing::instrument(skip(self, auth_token))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        auth_token: Option<AuthToken>,
    ) -> Result<Order, DomainError> {
        let order = self.load(order_id).await?;
        self.transition(order, target, auth_token.as_ref()).await
    }

    /// Cancels an order on behalf of its owner.
    ///
    /// Owners may only cancel orders that are still PENDING, even though
    /// the status machine also allows cancelling a PAID order.
    #[tracing::instrument(skip(self, auth_token))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        user: &UserRef,
        auth_token: Option<AuthToken>,
    ) -> Result<Order, DomainError> {
        let order = self.load(order_id).await?;
        if !order.is_owned_by(user) {
            return Err(DomainError::unauthorized(user, "order", order_id));
        }
        if order.status() != OrderStatus::Pending {
            return Err(DomainError::InvalidState(
                "only PENDING orders can be cancelled by user".to_string(),
            ));
        }
        self.transition(order, OrderStatus::Cancelled, auth_token.as_ref())
            .await
    }

    /// Refunds a paid order. Administrative: no ownership check.
    #[tracing::instrument(skip(self, auth_token))]
    pub async fn refund_order(
        &self,
        order_id: OrderId,
        auth_token: Option<AuthToken>,
    ) -> Result<Order, DomainError> {
        let order = self.load(order_id).await?;
        self.transition(order, OrderStatus::Refunded, auth_token.as_ref())
            .await
    }

    /// Loads an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.load(order_id).await
    }

    /// Lists orders matching a query, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>, DomainError> {
        let records = self.store.query_orders(query).await?;
        records
            .into_iter()
            .map(|record| Order::try_from(record).map_err(DomainError::from))
            .collect()
    }

    /// Returns the status changes of an order, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn order_history(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderStatusChanged>, DomainError> {
        if !self.store.order_exists(order_id).await? {
            return Err(DomainError::not_found("order", order_id));
        }

        let records = self.store.get_order_events(order_id).await?;
        records
            .into_iter()
            .filter(|record| record.event_type == OrderStatusChanged::EVENT_TYPE)
            .map(|record| OrderStatusChanged::from_record(record).map_err(DomainError::from))
            .collect()
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let record = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;
        Ok(Order::try_from(record)?)
    }

    async fn transition(
        &self,
        mut order: Order,
        target: OrderStatus,
        auth_token: Option<&AuthToken>,
    ) -> Result<Order, DomainError> {
        let from = order.status();
        order.transition_to(target)?;

        let events = order
            .domain_events()
            .iter()
            .map(|event| event.to_record())
            .collect::<Result<Vec<_>, _>>()?;
        self.store
            .commit(
                ChangeSet::new()
                    .put_order(order.to_record())
                    .append_events(events),
            )
            .await?;
        order.mark_persisted();

        tracing::info!(order_id = %order.id(), %from, to = %target, "Order status changed");
        metrics::counter!(
            "order_transitions_total",
            "from" => from.as_str(),
            "to" => target.as_str()
        )
        .increment(1);

        self.dispatcher
            .dispatch_all(effects::after_transition(&order, auth_token));
        Ok(order)
    }
}
