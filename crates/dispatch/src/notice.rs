//! Data carried by notifications.

use std::fmt;

use common::{CustomerContact, OrderId, ShippingAddress, UserRef};
use serde::{Deserialize, Serialize};

/// Caller credential forwarded to the notification service.
///
/// The value is never printed: `Debug` and `Display` both redact it, so it
/// is safe to pass through instrumented functions.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// A line of an order as shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeLine {
    pub product_ref: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// Snapshot of an order taken when the notification was queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNotice {
    pub order_id: OrderId,
    pub user_ref: UserRef,
    pub status: String,
    pub total_cents: i64,
    pub currency: String,
    pub customer: CustomerContact,
    pub shipping: ShippingAddress,
    pub lines: Vec<NoticeLine>,
}

impl OrderNotice {
    /// Name used to greet the customer.
    pub fn customer_name(&self) -> String {
        self.customer.display_name(&self.shipping)
    }
}

/// Status updates that have their own notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusNotice {
    PaymentReceived,
    Delivered,
    Cancelled,
    Refunded,
}

impl StatusNotice {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusNotice::PaymentReceived => "payment_received",
            StatusNotice::Delivered => "delivered",
            StatusNotice::Cancelled => "cancelled",
            StatusNotice::Refunded => "refunded",
        }
    }
}

impl fmt::Display for StatusNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
