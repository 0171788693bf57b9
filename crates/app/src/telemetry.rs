//! Tracing and metrics initialisation.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogFormat};
use crate::error::AppError;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` syntax is accepted in `log_level`; an invalid directive
/// falls back to `info`.
pub fn init_tracing(config: &Config) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
    .map_err(|e| AppError::Telemetry(e.to_string()))
}

/// Installs the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), AppError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::Telemetry(e.to_string()))?;

    metrics::describe_counter!("carts_created_total", "Carts opened");
    metrics::describe_counter!("orders_created_total", "Orders created outside checkout");
    metrics::describe_counter!("checkouts_total", "Successful checkouts");
    metrics::describe_counter!("checkout_failures_total", "Rejected or failed checkouts");
    metrics::describe_counter!(
        "checkout_unreconciled_charges_total",
        "Approved charges whose checkout failed to commit"
    );
    metrics::describe_counter!("order_transitions_total", "Committed order status changes");
    metrics::describe_counter!("store_commits_total", "Change sets committed to PostgreSQL");
    metrics::describe_counter!(
        "side_effects_dispatched_total",
        "Side effects completed by collaborators"
    );
    metrics::describe_counter!(
        "side_effects_failed_total",
        "Side effects that failed or timed out"
    );
    metrics::describe_counter!(
        "side_effects_dropped_total",
        "Side effects dropped before reaching the worker"
    );
    metrics::describe_histogram!(
        "side_effect_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent on one collaborator call"
    );

    tracing::info!(%addr, "Prometheus metrics listener started");
    Ok(())
}
