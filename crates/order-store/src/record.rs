use chrono::{DateTime, Utc};
use common::{
    CartId, CartItemId, CustomerContact, EventId, OrderId, PaymentMethod, ShippingAddress, UserRef,
};
use serde::{Deserialize, Serialize};

/// Stored status string of a cart that still accepts items.
pub const CART_STATUS_OPEN: &str = "OPEN";

/// Version number of a stored cart or order, used for optimistic
/// concurrency control.
///
/// A record that has never been stored is at version 0; each committed
/// write increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a record that has never been stored.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version after the first write.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored shopping cart together with its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartRecord {
    pub id: CartId,
    pub user_ref: UserRef,
    /// `OPEN` or `CHECKED_OUT`.
    pub status: String,
    /// Items in insertion order.
    pub items: Vec<CartItemRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Version as read from the store; [`Version::initial`] for a new cart.
    pub version: Version,
}

impl CartRecord {
    /// Returns true if the stored status is `OPEN`, ignoring case.
    pub fn is_open(&self) -> bool {
        self.status.eq_ignore_ascii_case(CART_STATUS_OPEN)
    }
}

/// A stored cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRecord {
    pub id: CartItemId,
    pub product_ref: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_ref: UserRef,
    /// Upper-case status name, e.g. `PENDING`.
    pub status: String,
    pub total_cents: i64,
    pub currency: String,
    pub placed_at: Option<DateTime<Utc>>,
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub customer: CustomerContact,
    /// Line items, written once when the order is first stored.
    pub lines: Vec<OrderLineRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Version as read from the store; [`Version::initial`] for a new order.
    pub version: Version,
}

/// A stored order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub product_ref: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub currency: String,
}

/// An append-only record of one order status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEventRecord {
    pub id: EventId,
    pub order_id: OrderId,
    /// Event type name, e.g. `OrderStatusChanged`.
    pub event_type: String,
    /// JSON payload, e.g. `{"from":"PENDING","to":"PAID"}`.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
    }

    #[test]
    fn test_version_initial_and_first() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::first().as_i64(), 1);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn test_cart_record_open_check_ignores_case() {
        let now = Utc::now();
        let mut cart = CartRecord {
            id: CartId::new(),
            user_ref: UserRef::from("u-1"),
            status: CART_STATUS_OPEN.to_string(),
            items: vec![],
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        };
        assert!(cart.is_open());

        cart.status = "open".to_string();
        assert!(cart.is_open());

        cart.status = "CHECKED_OUT".to_string();
        assert!(!cart.is_open());
    }
}
