//! Order service host.
//!
//! Wires the domain services to a store and the side-effect dispatcher,
//! with structured logging (tracing) and Prometheus metrics. Transport is
//! left to the embedding application.

pub mod config;
pub mod error;
pub mod telemetry;

use std::sync::Arc;

use dispatch::{
    DispatchWorker, Dispatcher, InMemoryPaymentAuthority, LoggingNotifier, LoggingStockAdjuster,
    Notifier, PaymentAuthority, StockAdjuster,
};
use domain::{CartService, CheckoutService, OrderLifecycleService};
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore, StoreError};
use sqlx::postgres::PgPoolOptions;

use config::Config;
use error::AppError;

/// Store shared by every service.
pub type SharedStore = Arc<dyn OrderStore>;

/// The domain services, ready to serve requests.
pub struct Services {
    pub carts: CartService<SharedStore>,
    pub checkout: CheckoutService<SharedStore>,
    pub orders: OrderLifecycleService<SharedStore>,
}

/// External collaborators used by the services.
#[derive(Clone)]
pub struct Collaborators {
    pub stock: Arc<dyn StockAdjuster>,
    pub notifier: Arc<dyn Notifier>,
    pub payments: Arc<dyn PaymentAuthority>,
}

impl Default for Collaborators {
    /// Logging stand-ins and an approving payment authority.
    fn default() -> Self {
        Self {
            stock: Arc::new(LoggingStockAdjuster),
            notifier: Arc::new(LoggingNotifier),
            payments: Arc::new(InMemoryPaymentAuthority::new()),
        }
    }
}

/// Opens the configured store.
///
/// With a `DATABASE_URL` this connects to PostgreSQL and runs migrations;
/// otherwise it returns an empty in-memory store.
pub async fn open_store(config: &Config) -> Result<SharedStore, AppError> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory store");
        return Ok(Arc::new(InMemoryOrderStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await?;
    let store = PostgresOrderStore::new(pool);
    store.run_migrations().await.map_err(StoreError::from)?;

    tracing::info!(
        max_connections = config.database_max_connections,
        "Connected to PostgreSQL"
    );
    Ok(Arc::new(store))
}

/// Builds the services around `store`.
///
/// The returned worker performs side effects; it must be spawned, and it
/// stops once the services are dropped.
pub fn build_services(
    store: SharedStore,
    collaborators: Collaborators,
    config: &Config,
) -> (Services, DispatchWorker) {
    let (dispatcher, worker) =
        Dispatcher::new(&config.dispatch, collaborators.stock, collaborators.notifier);

    let services = Services {
        carts: CartService::new(Arc::clone(&store)),
        checkout: CheckoutService::new(
            Arc::clone(&store),
            dispatcher.clone(),
            collaborators.payments,
        ),
        orders: OrderLifecycleService::new(store, dispatcher),
    };
    (services, worker)
}
