//! Notification sender.
//!
//! Consumes [`Notification`](calendar_core::Notification) envelopes from a
//! [`Queue`](calendar_queue::Queue) and hands each one to a
//! [`NotificationDelivery`] channel.

pub mod delivery;
pub mod sender;

pub use delivery::{DeliveryError, LogDelivery, NotificationDelivery};
pub use sender::{Sender, SenderConfig, SenderStats};
