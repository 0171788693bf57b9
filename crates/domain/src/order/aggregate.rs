//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerContact, OrderId, PaymentMethod, ShippingAddress, UserRef};
use dispatch::{NoticeLine, OrderNotice};
use order_store::{OrderLineRecord, OrderRecord, Version};

use super::{Money, OrderError, OrderLine, OrderStatus, OrderStatusChanged, UnknownStatus};

/// Descriptive details captured when an order is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDetails {
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub customer: CustomerContact,
}

/// Order aggregate root.
///
/// All status changes go through [`Order::transition_to`]; a rejected
/// transition leaves the order untouched. Each accepted transition queues
/// one [`OrderStatusChanged`] event until the order is persisted.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    user_ref: UserRef,
    status: OrderStatus,
    total: Money,
    currency: String,
    /// Set on the first transition into PAID, never changed afterwards.
    placed_at: Option<DateTime<Utc>>,
    details: OrderDetails,
    lines: Vec<OrderLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: Version,
    pending_events: Vec<OrderStatusChanged>,
}

impl Order {
    /// Creates a new PENDING order that has not been stored yet.
    pub fn new(
        user_ref: UserRef,
        total: Money,
        currency: impl Into<String>,
        lines: Vec<OrderLine>,
        details: OrderDetails,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_ref,
            status: OrderStatus::Pending,
            total,
            currency: currency.into(),
            placed_at: None,
            details,
            lines,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
            pending_events: Vec::new(),
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_ref(&self) -> &UserRef {
        &self.user_ref
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the total fixed at creation.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn details(&self) -> &OrderDetails {
        &self.details
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the version the order was loaded at.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns true if the order is owned by `user`.
    pub fn is_owned_by(&self, user: &UserRef) -> bool {
        &self.user_ref == user
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns a copy of the events queued since the last clear.
    pub fn domain_events(&self) -> Vec<OrderStatusChanged> {
        self.pending_events.clone()
    }
}

// Transitions
impl Order {
    /// Moves the order to `target` if the edge is allowed.
    ///
    /// On success the status and update timestamp change and one event is
    /// queued. Entering PAID also sets `placed_at` if it is unset.
    pub fn transition_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        let from = self.status;
        if !from.can_transition_to(target) {
            return Err(OrderError::InvalidTransition { from, to: target });
        }

        let now = Utc::now();
        if target == OrderStatus::Paid && self.placed_at.is_none() {
            self.placed_at = Some(now);
        }
        self.status = target;
        self.updated_at = now;
        self.pending_events
            .push(OrderStatusChanged::new(self.id, from, target, now));

        Ok(())
    }

    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Paid)
    }

    pub fn ship(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Shipped)
    }

    pub fn deliver(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Delivered)
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Cancelled)
    }

    pub fn refund(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Refunded)
    }

    /// Drops the queued events. The status is not affected.
    pub fn clear_domain_events(&mut self) {
        self.pending_events.clear();
    }

    /// Records a successful commit: the stored version moved on and the
    /// queued events are now persisted.
    pub(crate) fn mark_persisted(&mut self) {
        self.version = self.version.next();
        self.clear_domain_events();
    }
}

// Conversions
impl Order {
    /// Converts the order to its stored form at the version it was loaded at.
    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            user_ref: self.user_ref.clone(),
            status: self.status.as_str().to_string(),
            total_cents: self.total.cents(),
            currency: self.currency.clone(),
            placed_at: self.placed_at,
            shipping: self.details.shipping.clone(),
            payment_method: self.details.payment_method.clone(),
            customer: self.details.customer.clone(),
            lines: self
                .lines
                .iter()
                .map(|line| OrderLineRecord {
                    product_ref: line.product_ref.clone(),
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    currency: line.currency.clone(),
                })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    /// Snapshot of the order for notifications.
    pub fn to_notice(&self) -> OrderNotice {
        OrderNotice {
            order_id: self.id,
            user_ref: self.user_ref.clone(),
            status: self.status.as_str().to_string(),
            total_cents: self.total.cents(),
            currency: self.currency.clone(),
            customer: self.details.customer.clone(),
            shipping: self.details.shipping.clone(),
            lines: self
                .lines
                .iter()
                .map(|line| NoticeLine {
                    product_ref: line.product_ref.clone(),
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                })
                .collect(),
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = UnknownStatus;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let status = record.status.parse::<OrderStatus>()?;
        Ok(Self {
            id: record.id,
            user_ref: record.user_ref,
            status,
            total: Money::from_cents(record.total_cents),
            currency: record.currency,
            placed_at: record.placed_at,
            details: OrderDetails {
                shipping: record.shipping,
                payment_method: record.payment_method,
                customer: record.customer,
            },
            lines: record
                .lines
                .into_iter()
                .map(|line| OrderLine {
                    product_ref: line.product_ref,
                    product_name: line.product_name,
                    quantity: line.quantity,
                    unit_price: Money::from_cents(line.unit_price_cents),
                    currency: line.currency,
                })
                .collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            pending_events: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_order() -> Order {
        Order::new(
            UserRef::from("u-1"),
            Money::from_cents(17500),
            "USD",
            vec![OrderLine {
                product_ref: "SKU-1".to_string(),
                product_name: Some("Widget".to_string()),
                quantity: 2,
                unit_price: Money::from_cents(5000),
                currency: "USD".to_string(),
            }],
            OrderDetails::default(),
        )
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = pending_order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.placed_at().is_none());
        assert!(order.domain_events().is_empty());
        assert_eq!(order.version(), Version::initial());
    }

    #[test]
    fn test_transition_queues_one_event() {
        let mut order = pending_order();
        order.mark_paid().unwrap();

        let events = order.domain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, OrderStatus::Pending);
        assert_eq!(events[0].to, OrderStatus::Paid);
        assert_eq!(events[0].order_id, order.id());
    }

    #[test]
    fn test_rejected_transition_leaves_order_unmodified() {
        let mut order = pending_order();
        let updated_at = order.updated_at();

        let result = order.ship();
        assert_eq!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped,
            })
        );
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.updated_at(), updated_at);
        assert!(order.domain_events().is_empty());
    }

    #[test]
    fn test_placed_at_set_once() {
        let mut order = pending_order();
        order.mark_paid().unwrap();
        let placed_at = order.placed_at();
        assert!(placed_at.is_some());

        order.ship().unwrap();
        order.deliver().unwrap();
        assert_eq!(order.placed_at(), placed_at);
        assert_eq!(order.domain_events().len(), 3);
    }

    #[test]
    fn test_terminal_orders_reject_every_target() {
        for path in [
            vec![OrderStatus::Cancelled],
            vec![OrderStatus::Paid, OrderStatus::Refunded],
            vec![OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Delivered],
        ] {
            let mut order = pending_order();
            for step in path {
                order.transition_to(step).unwrap();
            }
            assert!(order.is_terminal());
            for target in OrderStatus::ALL {
                assert!(order.transition_to(target).is_err());
            }
        }
    }

    #[test]
    fn test_events_copy_is_detached() {
        let mut order = pending_order();
        order.mark_paid().unwrap();

        let mut copy = order.domain_events();
        copy.clear();
        assert_eq!(order.domain_events().len(), 1);

        order.clear_domain_events();
        assert!(order.domain_events().is_empty());
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_record_round_trip() {
        let mut order = pending_order();
        order.mark_paid().unwrap();

        let record = order.to_record();
        assert_eq!(record.status, "PAID");
        assert_eq!(record.lines.len(), 1);
        assert_eq!(record.lines[0].unit_price_cents, 5000);

        let loaded = Order::try_from(record).unwrap();
        assert_eq!(loaded.status(), OrderStatus::Paid);
        assert_eq!(loaded.placed_at(), order.placed_at());
        assert!(loaded.domain_events().is_empty());
    }

    #[test]
    fn test_unknown_stored_status() {
        let mut record = pending_order().to_record();
        record.status = "on hold".to_string();
        assert!(Order::try_from(record).is_err());
    }

    #[test]
    fn test_lower_case_stored_status() {
        let mut record = pending_order().to_record();
        record.status = "shipped".to_string();
        assert_eq!(
            Order::try_from(record).unwrap().status(),
            OrderStatus::Shipped
        );
    }
}
