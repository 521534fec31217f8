//! Delivery channels for consumed notifications.

use async_trait::async_trait;
use calendar_core::{Envelope, Notification};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The channel refused the notification.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// A destination for notifications taken off the queue.
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn deliver(&self, envelope: &Envelope<Notification>) -> Result<(), DeliveryError>;
}

/// Writes every notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery;

#[async_trait]
impl NotificationDelivery for LogDelivery {
    async fn deliver(&self, envelope: &Envelope<Notification>) -> Result<(), DeliveryError> {
        let n = &envelope.body;
        tracing::info!(
            message_id = %envelope.id,
            event_id = %n.event_id,
            title = %n.title,
            user_id = %n.user_id,
            event_time = %n.event_time,
            "Notification received"
        );
        Ok(())
    }
}
