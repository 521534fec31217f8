//! Message queue abstraction for notification envelopes.
//!
//! [`Queue`] publishes [`Envelope`](calendar_core::Envelope)s to named
//! queues and hands out pull-based [`Subscription`]s. Implementations:
//!
//! - [`RabbitQueue`]: AMQP 0-9-1 via `lapin`, one channel for publishing and
//!   one per subscription.
//! - [`MemoryQueue`]: in-process named queues holding encoded payloads.
//!
//! Payloads are encoded with a [`Codec`]; [`JsonCodec`] is the default.

pub mod codec;
pub mod error;
pub mod memory;
pub mod queue;
pub mod rabbit;

pub use codec::{Codec, CodecError, JsonCodec};
pub use error::QueueError;
pub use memory::MemoryQueue;
pub use queue::{Queue, Subscription, POLL_BACKOFF, ROUTING_KEY};
pub use rabbit::{RabbitConfig, RabbitQueue};
