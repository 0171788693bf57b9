//! Order domain events.

use chrono::{DateTime, Utc};
use common::{EventId, OrderId};
use order_store::OrderEventRecord;
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// One status transition of an order.
///
/// Created only by a successful transition; stored append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Stored payload of [`OrderStatusChanged`].
#[derive(Debug, Serialize, Deserialize)]
struct StatusChangePayload {
    from: OrderStatus,
    to: OrderStatus,
}

impl OrderStatusChanged {
    /// Event type name as stored.
    pub const EVENT_TYPE: &'static str = "OrderStatusChanged";

    pub fn new(order_id: OrderId, from: OrderStatus, to: OrderStatus, at: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            from,
            to,
            occurred_at: at,
        }
    }

    /// Converts the event to its stored form with a `{"from", "to"}` payload.
    pub fn to_record(&self) -> Result<OrderEventRecord, serde_json::Error> {
        let payload = serde_json::to_value(StatusChangePayload {
            from: self.from,
            to: self.to,
        })?;

        Ok(OrderEventRecord {
            id: self.event_id,
            order_id: self.order_id,
            event_type: Self::EVENT_TYPE.to_string(),
            payload,
            created_at: self.occurred_at,
        })
    }

    /// Reads an event back from its stored form.
    pub fn from_record(record: OrderEventRecord) -> Result<Self, serde_json::Error> {
        let payload: StatusChangePayload = serde_json::from_value(record.payload)?;
        Ok(Self {
            event_id: record.id,
            order_id: record.order_id,
            from: payload.from,
            to: payload.to,
            occurred_at: record.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_payload() {
        let event = OrderStatusChanged::new(
            OrderId::new(),
            OrderStatus::Pending,
            OrderStatus::Paid,
            Utc::now(),
        );
        let record = event.to_record().unwrap();

        assert_eq!(record.event_type, "OrderStatusChanged");
        assert_eq!(
            record.payload,
            serde_json::json!({"from": "PENDING", "to": "PAID"})
        );
        assert_eq!(OrderStatusChanged::from_record(record).unwrap(), event);
    }

    #[test]
    fn test_unknown_status_in_payload_is_rejected() {
        let mut record = OrderStatusChanged::new(
            OrderId::new(),
            OrderStatus::Paid,
            OrderStatus::Shipped,
            Utc::now(),
        )
        .to_record()
        .unwrap();
        record.payload = serde_json::json!({"from": "PAID", "to": "LOST"});

        assert!(OrderStatusChanged::from_record(record).is_err());
    }
}
