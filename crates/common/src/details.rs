//! Descriptive order details captured at order creation.
//!
//! These are carried verbatim from the caller to storage and to
//! notifications; nothing in the lifecycle depends on their contents.

use serde::{Deserialize, Serialize};

/// Where an order is shipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: Option<String>,
    pub street1: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

/// Non-sensitive description of how an order was paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Method kind, e.g. `CREDIT_CARD`.
    pub method_type: Option<String>,
    /// Last four digits of the card, if any.
    pub last4: Option<String>,
    pub brand: Option<String>,
}

/// How to reach the customer about an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl CustomerContact {
    /// Returns the display name for notifications.
    ///
    /// Prefers the stored customer name, then the shipping recipient,
    /// then a generic salutation.
    pub fn display_name(&self, shipping: &ShippingAddress) -> String {
        non_empty(&self.name)
            .filter(|name| *name != "Customer")
            .or_else(|| non_empty(&shipping.recipient))
            .unwrap_or("Customer")
            .to_string()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_customer_name() {
        let contact = CustomerContact {
            email: None,
            name: Some("Ada Lovelace".to_string()),
        };
        let shipping = ShippingAddress {
            recipient: Some("Front Desk".to_string()),
            ..Default::default()
        };
        assert_eq!(contact.display_name(&shipping), "Ada Lovelace");
    }

    #[test]
    fn display_name_falls_back_to_recipient() {
        let contact = CustomerContact {
            email: None,
            name: Some("Customer".to_string()),
        };
        let shipping = ShippingAddress {
            recipient: Some("Grace Hopper".to_string()),
            ..Default::default()
        };
        assert_eq!(contact.display_name(&shipping), "Grace Hopper");
    }

    #[test]
    fn display_name_default() {
        let contact = CustomerContact::default();
        assert_eq!(contact.display_name(&ShippingAddress::default()), "Customer");
    }
}
