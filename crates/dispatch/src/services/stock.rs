//! Stock adjustment collaborator.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DispatchError;

/// Trait for adjusting product stock levels.
#[async_trait]
pub trait StockAdjuster: Send + Sync {
    /// Adjusts the stock of a product by `delta` units.
    ///
    /// Negative deltas take stock (an order was placed), positive deltas
    /// return it (an order was cancelled or refunded).
    async fn adjust_stock(
        &self,
        product_ref: &str,
        delta: i32,
        reason: &str,
    ) -> Result<(), DispatchError>;
}

/// Stock adjuster that only logs the adjustment.
#[derive(Debug, Clone, Default)]
pub struct LoggingStockAdjuster;

#[async_trait]
impl StockAdjuster for LoggingStockAdjuster {
    async fn adjust_stock(
        &self,
        product_ref: &str,
        delta: i32,
        reason: &str,
    ) -> Result<(), DispatchError> {
        tracing::info!(product_ref, delta, reason, "Stock adjusted");
        Ok(())
    }
}

/// A recorded stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_ref: String,
    pub delta: i32,
    pub reason: String,
}

#[derive(Debug, Default)]
struct InMemoryStockState {
    adjustments: Vec<StockAdjustment>,
    fail_on_adjust: bool,
    delay: Option<Duration>,
}

/// In-memory stock adjuster for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockAdjuster {
    state: Arc<RwLock<InMemoryStockState>>,
}

impl InMemoryStockAdjuster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the adjuster to fail every call.
    pub fn set_fail_on_adjust(&self, fail: bool) {
        self.write().fail_on_adjust = fail;
    }

    /// Makes every call sleep before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.write().delay = delay;
    }

    /// Returns the adjustments applied so far.
    pub fn adjustments(&self) -> Vec<StockAdjustment> {
        self.read().adjustments.clone()
    }

    /// Returns the net adjustment of one product.
    pub fn net_delta(&self, product_ref: &str) -> i32 {
        self.read()
            .adjustments
            .iter()
            .filter(|a| a.product_ref == product_ref)
            .map(|a| a.delta)
            .sum()
    }

    /// Waits until at least `count` adjustments are recorded.
    pub async fn wait_for(&self, count: usize, within: Duration) -> bool {
        super::wait_until(within, || self.read().adjustments.len() >= count).await
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryStockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryStockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StockAdjuster for InMemoryStockAdjuster {
    async fn adjust_stock(
        &self,
        product_ref: &str,
        delta: i32,
        reason: &str,
    ) -> Result<(), DispatchError> {
        let (fail, delay) = {
            let state = self.read();
            (state.fail_on_adjust, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(DispatchError::StockService(format!(
                "Cannot adjust stock of {}",
                product_ref
            )));
        }

        self.write().adjustments.push(StockAdjustment {
            product_ref: product_ref.to_string(),
            delta,
            reason: reason.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_adjustments() {
        let adjuster = InMemoryStockAdjuster::new();
        adjuster.adjust_stock("SKU-1", -2, "placed").await.unwrap();
        adjuster.adjust_stock("SKU-1", 2, "cancelled").await.unwrap();
        adjuster.adjust_stock("SKU-2", -1, "placed").await.unwrap();

        assert_eq!(adjuster.adjustments().len(), 3);
        assert_eq!(adjuster.net_delta("SKU-1"), 0);
        assert_eq!(adjuster.net_delta("SKU-2"), -1);
    }

    #[tokio::test]
    async fn test_fail_on_adjust() {
        let adjuster = InMemoryStockAdjuster::new();
        adjuster.set_fail_on_adjust(true);

        let result = adjuster.adjust_stock("SKU-1", -1, "placed").await;
        assert!(matches!(result, Err(DispatchError::StockService(_))));
        assert!(adjuster.adjustments().is_empty());
    }

    #[tokio::test]
    async fn test_logging_adjuster_succeeds() {
        let adjuster = LoggingStockAdjuster;
        assert!(adjuster.adjust_stock("SKU-1", -1, "placed").await.is_ok());
    }
}
