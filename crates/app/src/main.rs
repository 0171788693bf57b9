//! Order service entry point.

use std::time::Duration;

use app::config::Config;
use app::error::AppError;
use app::{Collaborators, build_services, open_store, telemetry};
use tokio::signal;

/// How long in-flight side effects may take to finish on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    telemetry::init_tracing(&config)?;

    // 2. Install Prometheus metrics recorder and listener
    telemetry::init_metrics(config.metrics_addr)?;

    // 3. Open the store and build the services
    let store = open_store(&config).await?;
    let (services, worker) = build_services(store, Collaborators::default(), &config);
    let worker = worker.spawn();

    tracing::info!(
        call_timeout = ?config.dispatch.call_timeout,
        queue_capacity = config.dispatch.queue_capacity,
        "order service ready"
    );

    // 4. Serve until asked to stop
    shutdown_signal().await;

    // 5. Dropping the services closes the queue; let the worker drain it
    drop(services);
    if tokio::time::timeout(DRAIN_TIMEOUT, worker).await.is_err() {
        tracing::warn!("side-effect worker did not drain in time");
    }

    tracing::info!("order service shut down gracefully");
    Ok(())
}
