use crate::codec::CodecError;

/// Errors surfaced by [`Queue`](crate::Queue) implementations, either
/// returned directly or delivered on a subscription's error stream.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The broker could not be reached.
    #[error("Broker connection failed: {0}")]
    Connection(#[source] lapin::Error),

    /// A declare, publish, fetch or ack was rejected by the broker.
    #[error("Broker operation failed: {0}")]
    Broker(#[from] lapin::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] CodecError),

    #[error("Failed to decode message: {0}")]
    Decode(#[source] CodecError),

    /// The queue was closed before the operation.
    #[error("Queue is closed")]
    Closed,
}
