//! Side effects queued after lifecycle changes commit.

use chrono::{DateTime, Duration, Utc};
use common::OrderId;
use dispatch::{AuthToken, SideEffect, StatusNotice};

use crate::order::{Order, OrderStatus};

/// Days between shipping and the estimated delivery date.
const DELIVERY_DAYS: i64 = 3;

/// Stock adjustments for every line of an order.
///
/// `sign` is -1 to take stock and +1 to return it.
pub(crate) fn stock_adjustments(order: &Order, sign: i32, event: &str) -> Vec<SideEffect> {
    let reason = format!("order {} {}", order.id(), event);
    order
        .lines()
        .iter()
        .map(|line| SideEffect::AdjustStock {
            product_ref: line.product_ref.clone(),
            delta: sign * line.quantity,
            reason: reason.clone(),
        })
        .collect()
}

pub(crate) fn order_confirmation(order: &Order, auth_token: &AuthToken) -> SideEffect {
    SideEffect::OrderConfirmation {
        order: order.to_notice(),
        auth_token: auth_token.clone(),
    }
}

/// Effects that follow an order entering its current status.
pub(crate) fn after_transition(order: &Order, auth_token: Option<&AuthToken>) -> Vec<SideEffect> {
    let mut effects = match order.status() {
        OrderStatus::Cancelled => stock_adjustments(order, 1, "cancelled"),
        OrderStatus::Refunded => stock_adjustments(order, 1, "refunded"),
        _ => Vec::new(),
    };

    let Some(auth_token) = auth_token else {
        return effects;
    };

    let status = match order.status() {
        OrderStatus::Pending => None,
        OrderStatus::Paid => Some(StatusNotice::PaymentReceived),
        OrderStatus::Shipped => {
            let now = Utc::now();
            effects.push(SideEffect::Shipping {
                order: order.to_notice(),
                tracking_id: tracking_id(order.id(), now),
                estimated_delivery: estimated_delivery(now),
                auth_token: auth_token.clone(),
            });
            None
        }
        OrderStatus::Delivered => Some(StatusNotice::Delivered),
        OrderStatus::Cancelled => Some(StatusNotice::Cancelled),
        OrderStatus::Refunded => Some(StatusNotice::Refunded),
    };

    if let Some(status) = status {
        effects.push(SideEffect::StatusUpdate {
            order: order.to_notice(),
            status,
            auth_token: auth_token.clone(),
        });
    }
    effects
}

/// Generates a tracking identifier, e.g. `TRACK-<order id>-1760000000000`.
pub(crate) fn tracking_id(order_id: OrderId, now: DateTime<Utc>) -> String {
    format!("TRACK-{}-{}", order_id, now.timestamp_millis())
}

/// Formats the estimated delivery date, e.g. `October 21, 2026`.
pub(crate) fn estimated_delivery(shipped_at: DateTime<Utc>) -> String {
    (shipped_at + Duration::days(DELIVERY_DAYS))
        .format("%B %d, %Y")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Money, OrderDetails, OrderLine};
    use chrono::TimeZone;
    use common::UserRef;

    fn order_with_lines() -> Order {
        let line = |product: &str, quantity| OrderLine {
            product_ref: product.to_string(),
            product_name: None,
            quantity,
            unit_price: Money::from_cents(100),
            currency: "USD".to_string(),
        };
        Order::new(
            UserRef::from("u-1"),
            Money::from_cents(500),
            "USD",
            vec![line("SKU-1", 2), line("SKU-2", 3)],
            OrderDetails::default(),
        )
    }

    #[test]
    fn test_stock_adjustments_per_line() {
        let order = order_with_lines();
        let effects = stock_adjustments(&order, -1, "placed");

        assert_eq!(effects.len(), 2);
        match &effects[1] {
            SideEffect::AdjustStock {
                product_ref,
                delta,
                reason,
            } => {
                assert_eq!(product_ref, "SKU-2");
                assert_eq!(*delta, -3);
                assert_eq!(reason, &format!("order {} placed", order.id()));
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_cancel_returns_stock_without_token() {
        let mut order = order_with_lines();
        order.cancel().unwrap();

        let effects = after_transition(&order, None);
        assert_eq!(effects.len(), 2);
        assert!(effects.iter().all(|e| e.name() == "adjust_stock"));
    }

    #[test]
    fn test_shipping_notification_with_token() {
        let mut order = order_with_lines();
        order.mark_paid().unwrap();
        order.ship().unwrap();

        let effects = after_transition(&order, Some(&AuthToken::new("t")));
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            SideEffect::Shipping { tracking_id, .. } => {
                assert!(tracking_id.starts_with(&format!("TRACK-{}-", order.id())));
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_no_notification_without_token() {
        let mut order = order_with_lines();
        order.mark_paid().unwrap();
        assert!(after_transition(&order, None).is_empty());
    }

    #[test]
    fn test_estimated_delivery_format() {
        let shipped_at = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        assert_eq!(estimated_delivery(shipped_at), "October 21, 2026");

        let month_end = Utc.with_ymd_and_hms(2026, 1, 30, 0, 0, 0).unwrap();
        assert_eq!(estimated_delivery(month_end), "February 02, 2026");
    }
}
