use std::sync::Arc;
use std::time::Duration;

use calendar_core::Notification;
use calendar_queue::{Queue, RabbitConfig, RabbitQueue};
use calendar_sender::{LogDelivery, Sender, SenderConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "calendar_sender=info,calendar_queue=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = SenderConfig::from_env();

    let queue: Arc<dyn Queue<Notification>> =
        match RabbitQueue::<Notification>::connect(&RabbitConfig::from_env()).await {
            Ok(queue) => Arc::new(queue),
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to message broker");
                std::process::exit(1);
            }
        };

    let cancel = CancellationToken::new();
    let sender = Sender::new(Arc::clone(&queue), Arc::new(LogDelivery), config);
    let run_cancel = cancel.clone();
    let sender_handle = tokio::spawn(async move { sender.run(run_cancel).await });

    shutdown_signal().await;
    cancel.cancel();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, sender_handle).await {
        Ok(Ok(Ok(_stats))) => {}
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Failed to subscribe to queue"),
        Ok(Err(e)) => tracing::error!(error = %e, "Sender task panicked"),
        Err(_) => tracing::warn!("Sender did not stop in time"),
    }
    if let Err(e) = queue.close().await {
        tracing::warn!(error = %e, "Failed to close message broker connection");
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
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
