//! Customer notification collaborator.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;

use crate::error::DispatchError;
use crate::notice::{AuthToken, OrderNotice, StatusNotice};

/// Trait for sending customer notifications about an order.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Confirms a newly placed order.
    async fn send_order_confirmation(
        &self,
        order: &OrderNotice,
        auth_token: &AuthToken,
    ) -> Result<(), DispatchError>;

    /// Announces that an order has shipped.
    async fn send_shipping_notification(
        &self,
        order: &OrderNotice,
        tracking_id: &str,
        estimated_delivery: &str,
        auth_token: &AuthToken,
    ) -> Result<(), DispatchError>;

    /// Announces any other status change that has a notification.
    async fn send_status_update(
        &self,
        order: &OrderNotice,
        status: StatusNotice,
        auth_token: &AuthToken,
    ) -> Result<(), DispatchError>;
}

/// Notifier that writes every notification to the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_order_confirmation(
        &self,
        order: &OrderNotice,
        _auth_token: &AuthToken,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            order_id = %order.order_id,
            customer = %order.customer_name(),
            total_cents = order.total_cents,
            lines = order.lines.len(),
            "Order confirmation sent"
        );
        Ok(())
    }

    async fn send_shipping_notification(
        &self,
        order: &OrderNotice,
        tracking_id: &str,
        estimated_delivery: &str,
        _auth_token: &AuthToken,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            order_id = %order.order_id,
            customer = %order.customer_name(),
            tracking_id,
            estimated_delivery,
            "Shipping notification sent"
        );
        Ok(())
    }

    async fn send_status_update(
        &self,
        order: &OrderNotice,
        status: StatusNotice,
        _auth_token: &AuthToken,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            order_id = %order.order_id,
            customer = %order.customer_name(),
            %status,
            "Status notification sent"
        );
        Ok(())
    }
}

/// A notification captured by [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    OrderConfirmation {
        order_id: OrderId,
        customer_name: String,
    },
    Shipping {
        order_id: OrderId,
        tracking_id: String,
        estimated_delivery: String,
    },
    Status {
        order_id: OrderId,
        status: StatusNotice,
    },
}

impl Notification {
    pub fn order_id(&self) -> OrderId {
        match self {
            Notification::OrderConfirmation { order_id, .. }
            | Notification::Shipping { order_id, .. }
            | Notification::Status { order_id, .. } => *order_id,
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notification>,
    fail_on_send: bool,
    delay: Option<Duration>,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail every send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.write().fail_on_send = fail;
    }

    /// Makes every send sleep before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.write().delay = delay;
    }

    /// Returns the notifications sent so far, in send order.
    pub fn sent(&self) -> Vec<Notification> {
        self.read().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.read().sent.len()
    }

    /// Waits until at least `count` notifications are recorded.
    pub async fn wait_for(&self, count: usize, within: Duration) -> bool {
        super::wait_until(within, || self.read().sent.len() >= count).await
    }

    async fn record(&self, notification: Notification) -> Result<(), DispatchError> {
        let (fail, delay) = {
            let state = self.read();
            (state.fail_on_send, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(DispatchError::NotificationService(format!(
                "Cannot notify about order {}",
                notification.order_id()
            )));
        }

        self.write().sent.push(notification);
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryNotifierState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryNotifierState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send_order_confirmation(
        &self,
        order: &OrderNotice,
        _auth_token: &AuthToken,
    ) -> Result<(), DispatchError> {
        self.record(Notification::OrderConfirmation {
            order_id: order.order_id,
            customer_name: order.customer_name(),
        })
        .await
    }

    async fn send_shipping_notification(
        &self,
        order: &OrderNotice,
        tracking_id: &str,
        estimated_delivery: &str,
        _auth_token: &AuthToken,
    ) -> Result<(), DispatchError> {
        self.record(Notification::Shipping {
            order_id: order.order_id,
            tracking_id: tracking_id.to_string(),
            estimated_delivery: estimated_delivery.to_string(),
        })
        .await
    }

    async fn send_status_update(
        &self,
        order: &OrderNotice,
        status: StatusNotice,
        _auth_token: &AuthToken,
    ) -> Result<(), DispatchError> {
        self.record(Notification::Status {
            order_id: order.order_id,
            status,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserRef;

    fn notice() -> OrderNotice {
        OrderNotice {
            order_id: OrderId::new(),
            user_ref: UserRef::from("u-1"),
            status: "PENDING".to_string(),
            total_cents: 2500,
            currency: "USD".to_string(),
            customer: Default::default(),
            shipping: Default::default(),
            lines: vec![],
        }
    }

    #[tokio::test]
    async fn test_records_in_send_order() {
        let notifier = InMemoryNotifier::new();
        let order = notice();
        let token = AuthToken::new("t");

        notifier.send_order_confirmation(&order, &token).await.unwrap();
        notifier
            .send_status_update(&order, StatusNotice::Cancelled, &token)
            .await
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            Notification::OrderConfirmation {
                order_id: order.order_id,
                customer_name: "Customer".to_string(),
            }
        );
        assert_eq!(
            sent[1],
            Notification::Status {
                order_id: order.order_id,
                status: StatusNotice::Cancelled,
            }
        );
    }

    #[tokio::test]
    async fn test_fail_on_send() {
        let notifier = InMemoryNotifier::new();
        notifier.set_fail_on_send(true);

        let result = notifier
            .send_shipping_notification(&notice(), "TRACK-1", "May 01, 2026", &AuthToken::new("t"))
            .await;
        assert!(matches!(result, Err(DispatchError::NotificationService(_))));
        assert_eq!(notifier.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let notifier = InMemoryNotifier::new();
        assert!(!notifier.wait_for(1, Duration::from_millis(20)).await);
    }
}
