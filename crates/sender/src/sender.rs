//! The consume loop.

use std::sync::Arc;

use calendar_core::Notification;
use calendar_queue::{Queue, QueueError};
use tokio_util::sync::CancellationToken;

use crate::delivery::NotificationDelivery;

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub queue_name: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            queue_name: "notifications".into(),
        }
    }
}

impl SenderConfig {
    /// | Env Var            | Default         |
    /// |--------------------|-----------------|
    /// | `EVENT_QUEUE_NAME` | `notifications` |
    pub fn from_env() -> Self {
        Self {
            queue_name: std::env::var("EVENT_QUEUE_NAME")
                .unwrap_or_else(|_| Self::default().queue_name),
        }
    }
}

/// Counters accumulated by one [`Sender::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub delivered: u64,
    pub failed: u64,
    /// Decode and fetch errors reported by the subscription.
    pub stream_errors: u64,
}

pub struct Sender {
    queue: Arc<dyn Queue<Notification>>,
    delivery: Arc<dyn NotificationDelivery>,
    config: SenderConfig,
}

impl Sender {
    pub fn new(
        queue: Arc<dyn Queue<Notification>>,
        delivery: Arc<dyn NotificationDelivery>,
        config: SenderConfig,
    ) -> Self {
        Self {
            queue,
            delivery,
            config,
        }
    }

    /// Consume until `cancel` fires or the subscription ends.
    ///
    /// Stream errors and failed deliveries are logged and counted; neither
    /// stops consumption.
    pub async fn run(&self, cancel: CancellationToken) -> Result<SenderStats, QueueError> {
        let mut subscription = self.queue.get(&self.config.queue_name, cancel.clone()).await?;
        let mut stats = SenderStats::default();
        let mut errors_open = true;

        tracing::info!(queue = %self.config.queue_name, "Sender started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                envelope = subscription.envelopes.recv() => {
                    let Some(envelope) = envelope else { break };
                    match self.delivery.deliver(&envelope).await {
                        Ok(()) => stats.delivered += 1,
                        Err(e) => {
                            tracing::error!(
                                message_id = %envelope.id,
                                error = %e,
                                "Failed to deliver notification"
                            );
                            stats.failed += 1;
                        }
                    }
                }
                err = subscription.errors.recv(), if errors_open => match err {
                    Some(e) => {
                        tracing::warn!(queue = %self.config.queue_name, error = %e, "Queue error");
                        stats.stream_errors += 1;
                    }
                    None => errors_open = false,
                },
            }
        }

        subscription.shutdown().await;
        tracing::info!(
            delivered = stats.delivered,
            failed = stats.failed,
            stream_errors = stats.stream_errors,
            "Sender stopped"
        );
        Ok(stats)
    }
}
