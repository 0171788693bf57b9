//! Fire-and-forget side-effect dispatch.
//!
//! [`Dispatcher`] is the cheap, cloneable handle held by the services.
//! [`DispatchWorker`] owns the receiving end of the queue and the
//! collaborators, and runs each effect on its own task so that one slow
//! call never holds up the rest.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::notice::{AuthToken, OrderNotice, StatusNotice};
use crate::services::{Notifier, StockAdjuster};

/// A unit of work performed after a state change has committed.
#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Adjust the stock of one product.
    AdjustStock {
        product_ref: String,
        delta: i32,
        reason: String,
    },
    /// Confirm a newly placed order.
    OrderConfirmation {
        order: OrderNotice,
        auth_token: AuthToken,
    },
    /// Announce a shipment.
    Shipping {
        order: OrderNotice,
        tracking_id: String,
        estimated_delivery: String,
        auth_token: AuthToken,
    },
    /// Announce another status change.
    StatusUpdate {
        order: OrderNotice,
        status: StatusNotice,
        auth_token: AuthToken,
    },
}

impl SideEffect {
    /// Short name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            SideEffect::AdjustStock { .. } => "adjust_stock",
            SideEffect::OrderConfirmation { .. } => "order_confirmation",
            SideEffect::Shipping { .. } => "shipping_notification",
            SideEffect::StatusUpdate { .. } => "status_notification",
        }
    }

    fn is_notification(&self) -> bool {
        !matches!(self, SideEffect::AdjustStock { .. })
    }
}

/// Handle for queueing side effects.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<SideEffect>,
    notifications_enabled: bool,
    stock_adjustment_enabled: bool,
}

impl Dispatcher {
    /// Creates a dispatcher and the worker that drains it.
    ///
    /// The worker does nothing until it is spawned or run.
    pub fn new(
        config: &DispatchConfig,
        stock: Arc<dyn StockAdjuster>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, DispatchWorker) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let dispatcher = Self {
            tx,
            notifications_enabled: config.notifications_enabled,
            stock_adjustment_enabled: config.stock_adjustment_enabled,
        };
        let worker = DispatchWorker {
            rx,
            stock,
            notifier,
            call_timeout: config.call_timeout,
        };
        (dispatcher, worker)
    }

    /// Queues an effect without waiting.
    ///
    /// Never fails: a full or closed queue drops the effect with a warning.
    pub fn dispatch(&self, effect: SideEffect) {
        if effect.is_notification() && !self.notifications_enabled {
            tracing::debug!(effect = effect.name(), "Notifications disabled, skipping");
            return;
        }
        if !effect.is_notification() && !self.stock_adjustment_enabled {
            tracing::debug!(effect = effect.name(), "Stock adjustment disabled, skipping");
            return;
        }

        match self.tx.try_send(effect) {
            Ok(()) => {}
            Err(TrySendError::Full(effect)) => {
                tracing::warn!(effect = effect.name(), "Side-effect queue full, dropping");
                metrics::counter!("side_effects_dropped_total", "reason" => "full").increment(1);
            }
            Err(TrySendError::Closed(effect)) => {
                tracing::warn!(effect = effect.name(), "Side-effect worker stopped, dropping");
                metrics::counter!("side_effects_dropped_total", "reason" => "closed").increment(1);
            }
        }
    }

    /// Queues every effect in order.
    pub fn dispatch_all(&self, effects: impl IntoIterator<Item = SideEffect>) {
        for effect in effects {
            self.dispatch(effect);
        }
    }
}

/// Background task that performs queued side effects.
pub struct DispatchWorker {
    rx: mpsc::Receiver<SideEffect>,
    stock: Arc<dyn StockAdjuster>,
    notifier: Arc<dyn Notifier>,
    call_timeout: Duration,
}

impl DispatchWorker {
    /// Spawns the worker on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until every [`Dispatcher`] handle is dropped, then waits for
    /// in-flight effects to finish.
    pub async fn run(mut self) {
        let mut in_flight = JoinSet::new();
        tracing::info!("Side-effect worker started");

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(effect) => {
                        let stock = Arc::clone(&self.stock);
                        let notifier = Arc::clone(&self.notifier);
                        let call_timeout = self.call_timeout;
                        in_flight.spawn(async move {
                            execute(effect, stock.as_ref(), notifier.as_ref(), call_timeout).await;
                        });
                    }
                    None => break,
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        while in_flight.join_next().await.is_some() {}
        tracing::info!("Side-effect worker stopped");
    }
}

async fn execute(
    effect: SideEffect,
    stock: &dyn StockAdjuster,
    notifier: &dyn Notifier,
    call_timeout: Duration,
) {
    let name = effect.name();
    let start = Instant::now();

    let result = match tokio::time::timeout(call_timeout, perform(&effect, stock, notifier)).await
    {
        Ok(result) => result,
        Err(_) => Err(DispatchError::Timeout {
            effect: name,
            after: call_timeout,
        }),
    };

    metrics::histogram!("side_effect_duration_seconds", "effect" => name)
        .record(start.elapsed().as_secs_f64());

    match result {
        Ok(()) => {
            tracing::debug!(effect = name, "Side effect completed");
            metrics::counter!("side_effects_dispatched_total", "effect" => name).increment(1);
        }
        Err(e) => {
            tracing::warn!(effect = name, error = %e, "Side effect failed");
            metrics::counter!("side_effects_failed_total", "effect" => name).increment(1);
        }
    }
}

async fn perform(
    effect: &SideEffect,
    stock: &dyn StockAdjuster,
    notifier: &dyn Notifier,
) -> Result<(), DispatchError> {
    match effect {
        SideEffect::AdjustStock {
            product_ref,
            delta,
            reason,
        } => stock.adjust_stock(product_ref, *delta, reason).await,
        SideEffect::OrderConfirmation { order, auth_token } => {
            notifier.send_order_confirmation(order, auth_token).await
        }
        SideEffect::Shipping {
            order,
            tracking_id,
            estimated_delivery,
            auth_token,
        } => {
            notifier
                .send_shipping_notification(order, tracking_id, estimated_delivery, auth_token)
                .await
        }
        SideEffect::StatusUpdate {
            order,
            status,
            auth_token,
        } => notifier.send_status_update(order, *status, auth_token).await,
    }
}
