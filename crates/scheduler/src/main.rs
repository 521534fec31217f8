use std::sync::Arc;
use std::time::Duration;

use calendar_core::Notification;
use calendar_queue::{Queue, RabbitConfig, RabbitQueue};
use calendar_scheduler::{open_store, Scheduler, SchedulerConfig, StorageConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for the scheduler loop to finish its tick.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "calendar_scheduler=info,calendar_db=info,calendar_queue=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let storage_config = StorageConfig::from_env();
    let config = SchedulerConfig::from_env();
    tracing::info!(
        backend = ?storage_config.backend,
        tz = %storage_config.tz,
        check_interval_ms = config.check_interval.as_millis() as u64,
        "Loaded scheduler configuration"
    );

    // --- Storage ---
    let store = match open_store(&storage_config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open event store");
            std::process::exit(1);
        }
    };

    // --- Broker ---
    let queue: Arc<dyn Queue<Notification>> =
        match RabbitQueue::<Notification>::connect(&RabbitConfig::from_env()).await {
            Ok(queue) => Arc::new(queue),
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to message broker");
                if let Err(e) = store.close().await {
                    tracing::warn!(error = %e, "Failed to close event store");
                }
                std::process::exit(1);
            }
        };

    // --- Scheduler loop ---
    let cancel = CancellationToken::new();
    let scheduler = Scheduler::new(Arc::clone(&store), Arc::clone(&queue), config);
    let loop_cancel = cancel.clone();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(loop_cancel).await });

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler_handle).await {
        Ok(Ok(())) => tracing::info!("Scheduler stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Scheduler task panicked"),
        Err(_) => tracing::warn!("Scheduler did not stop in time"),
    }
    if let Err(e) = queue.close().await {
        tracing::warn!(error = %e, "Failed to close message broker connection");
    }
    if let Err(e) = store.close().await {
        tracing::warn!(error = %e, "Failed to close event store");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
