//! Checkout: turns an open cart into an order in one atomic commit.

use std::sync::Arc;

use common::{CartId, UserRef};
use dispatch::{AuthToken, Dispatcher, PaymentAuthority};
use order_store::{ChangeSet, OrderStore};

use crate::cart::Cart;
use crate::effects;
use crate::error::DomainError;
use crate::order::{Order, OrderDetails};

/// Service converting carts into orders.
///
/// The order insert and the cart closure are committed as one change set
/// guarded by the cart version that was read, so a cart is checked out at
/// most once even under concurrent requests.
pub struct CheckoutService<S: OrderStore> {
    store: S,
    dispatcher: Dispatcher,
    payments: Arc<dyn PaymentAuthority>,
}

impl<S: OrderStore> CheckoutService<S> {
    pub fn new(store: S, dispatcher: Dispatcher, payments: Arc<dyn PaymentAuthority>) -> Self {
        Self {
            store,
            dispatcher,
            payments,
        }
    }

    /// Creates a PENDING order from the cart and closes the cart.
    ///
    /// The total is the sum of the cart lines at their captured prices.
    /// With an auth token, an order confirmation is sent after the commit.
    #[tracing::instrument(skip(self, auth_token))]
    pub async fn checkout(
        &self,
        cart_id: CartId,
        user: &UserRef,
        auth_token: Option<AuthToken>,
    ) -> Result<Order, DomainError> {
        let result = async {
            let (cart, order) = self.prepare(cart_id, user).await?;
            self.commit(cart, order, auth_token.as_ref()).await
        }
        .await;
        record_outcome("checkout", &result);
        result
    }

    /// Charges the user, then checks out as PAID.
    ///
    /// A declined or failed charge writes nothing: the cart stays open and
    /// no order exists.
    #[tracing::instrument(skip(self, auth_token))]
    pub async fn process_checkout(
        &self,
        cart_id: CartId,
        user: &UserRef,
        auth_token: Option<AuthToken>,
    ) -> Result<Order, DomainError> {
        let result = async {
            let (cart, mut order) = self.prepare(cart_id, user).await?;

            let amount = order.total().to_decimal();
            let approved = match self.payments.charge(user, amount).await {
                Ok(approved) => approved,
                Err(e) => {
                    tracing::warn!(error = %e, "Payment failed");
                    false
                }
            };
            if !approved {
                return Err(DomainError::PaymentDeclined {
                    user: user.clone(),
                    amount,
                });
            }

            order.mark_paid()?;
            let order_id = order.id();
            self.commit(cart, order, auth_token.as_ref())
                .await
                .inspect_err(|e| {
                    tracing::error!(
                        user = %user,
                        %amount,
                        %cart_id,
                        %order_id,
                        error = %e,
                        "Charge captured but checkout was not committed"
                    );
                    metrics::counter!("checkout_unreconciled_charges_total").increment(1);
                })
        }
        .await;
        record_outcome("process_checkout", &result);
        result
    }

    /// Loads and validates the cart and builds the order, without writing.
    async fn prepare(&self, cart_id: CartId, user: &UserRef) -> Result<(Cart, Order), DomainError> {
        let record = self
            .store
            .get_cart(cart_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart", cart_id))?;
        let cart = Cart::try_from(record)?;

        if !cart.is_owned_by(user) {
            return Err(DomainError::unauthorized(user, "cart", cart_id));
        }
        cart.ensure_open()?;
        cart.ensure_not_empty()?;

        let total = cart.total()?;
        let currency = cart.currency()?.to_string();
        let order = Order::new(
            cart.user_ref().clone(),
            total,
            currency,
            cart.to_order_lines(),
            OrderDetails::default(),
        );
        Ok((cart, order))
    }

    async fn commit(
        &self,
        mut cart: Cart,
        mut order: Order,
        auth_token: Option<&AuthToken>,
    ) -> Result<Order, DomainError> {
        cart.close()?;

        let events = order
            .domain_events()
            .iter()
            .map(|event| event.to_record())
            .collect::<Result<Vec<_>, _>>()?;
        let changes = ChangeSet::new()
            .put_order(order.to_record())
            .append_events(events)
            .put_cart(cart.to_record());
        self.store.commit(changes).await?;
        order.mark_persisted();

        tracing::info!(
            cart_id = %cart.id(),
            order_id = %order.id(),
            total = %order.total(),
            status = %order.status(),
            "Cart checked out"
        );

        self.dispatcher
            .dispatch_all(effects::stock_adjustments(&order, -1, "placed"));
        if let Some(auth_token) = auth_token {
            self.dispatcher
                .dispatch(effects::order_confirmation(&order, auth_token));
        }

        Ok(order)
    }
}

fn record_outcome(operation: &'static str, result: &Result<Order, DomainError>) {
    match result {
        Ok(_) => {
            metrics::counter!("checkouts_total", "operation" => operation).increment(1);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Checkout failed");
            metrics::counter!(
                "checkout_failures_total",
                "operation" => operation,
                "kind" => format!("{:?}", e.kind())
            )
            .increment(1);
        }
    }
}
