//! Collaborator traits with logging and in-memory implementations.

pub mod notifier;
pub mod payment;
pub mod stock;

pub use notifier::{InMemoryNotifier, LoggingNotifier, Notification, Notifier};
pub use payment::{InMemoryPaymentAuthority, PaymentAuthority};
pub use stock::{InMemoryStockAdjuster, LoggingStockAdjuster, StockAdjuster, StockAdjustment};

use std::time::Duration;

/// Polls `check` until it returns true or `within` elapses.
pub(crate) async fn wait_until(within: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
