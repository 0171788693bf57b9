//! Payment authority collaborator.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::UserRef;
use rust_decimal::Decimal;

use crate::error::DispatchError;

/// Trait for charging a user before an order is created.
#[async_trait]
pub trait PaymentAuthority: Send + Sync {
    /// Charges `amount` in major currency units.
    ///
    /// Returns `Ok(false)` when the charge is declined.
    async fn charge(&self, user: &UserRef, amount: Decimal) -> Result<bool, DispatchError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges: Vec<(UserRef, Decimal)>,
    decline: bool,
    fail_on_charge: bool,
}

/// Payment authority that approves every charge unless told otherwise.
///
/// Approved charges are logged with a generated transaction id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentAuthority {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the authority to decline every charge.
    pub fn set_decline(&self, decline: bool) {
        self.write().decline = decline;
    }

    /// Configures the authority to error on every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.write().fail_on_charge = fail;
    }

    /// Returns the approved charges.
    pub fn charges(&self) -> Vec<(UserRef, Decimal)> {
        self.read().charges.clone()
    }

    pub fn charge_count(&self) -> usize {
        self.read().charges.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryPaymentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryPaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentAuthority for InMemoryPaymentAuthority {
    async fn charge(&self, user: &UserRef, amount: Decimal) -> Result<bool, DispatchError> {
        let mut state = self.write();

        if state.fail_on_charge {
            return Err(DispatchError::PaymentService(
                "Payment gateway unreachable".to_string(),
            ));
        }
        if state.decline {
            tracing::info!(user = %user, %amount, "Charge declined");
            return Ok(false);
        }

        let transaction_id = uuid::Uuid::new_v4();
        tracing::info!(user = %user, %amount, %transaction_id, "Charge approved");
        state.charges.push((user.clone(), amount));
        Ok(true)
    }
}
