//! The [`Queue`] contract and the pull loop shared by its implementations.

use std::time::Duration;

use async_trait::async_trait;
use calendar_core::Envelope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::codec::Codec;
use crate::error::QueueError;

/// Delay between fetches while the queue is empty.
pub const POLL_BACKOFF: Duration = Duration::from_millis(100);

/// Routing key used to bind queues to a named exchange.
pub const ROUTING_KEY: &str = "default";

/// Capacity of each subscription stream.
const STREAM_CAPACITY: usize = 32;

/// Publish/subscribe access to named queues of `Envelope<T>`.
#[async_trait]
pub trait Queue<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Declare the topology for `queue` (and `exchange`, when non-empty) and
    /// publish `envelope` with its id as the message id.
    async fn put(
        &self,
        queue: &str,
        exchange: &str,
        envelope: Envelope<T>,
    ) -> Result<(), QueueError>;

    /// Start a background pull loop over `queue`. The loop stops when
    /// `cancel` fires or the subscription is dropped.
    async fn get(
        &self,
        queue: &str,
        cancel: CancellationToken,
    ) -> Result<Subscription<T>, QueueError>;

    /// Release broker resources. Later calls are no-ops.
    async fn close(&self) -> Result<(), QueueError>;
}

/// The consumer side of a [`Queue::get`] call.
///
/// Decoded envelopes arrive on `envelopes`; decode and fetch failures arrive
/// on `errors`. Both channels close once the pull loop exits.
#[derive(Debug)]
pub struct Subscription<T> {
    pub envelopes: mpsc::Receiver<Envelope<T>>,
    pub errors: mpsc::Receiver<QueueError>,
    handle: JoinHandle<()>,
}

impl<T> Subscription<T> {
    /// Whether the pull loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Drop both streams and wait for the pull loop to exit.
    pub async fn shutdown(self) {
        let Subscription {
            envelopes,
            errors,
            handle,
        } = self;
        drop(envelopes);
        drop(errors);
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Queue pull loop panicked");
        }
    }
}

// ---------------------------------------------------------------------------
// Pull loop
// ---------------------------------------------------------------------------

/// An encoded message taken from a queue but not yet acknowledged.
pub(crate) struct RawMessage<A> {
    pub payload: Vec<u8>,
    pub message_id: Option<String>,
    pub ack: A,
}

/// Backend hook driven by [`spawn_pull_loop`].
#[async_trait]
pub(crate) trait MessageSource: Send + 'static {
    type Ack: Send;

    /// Non-blocking fetch; `Ok(None)` when the queue is empty.
    async fn fetch(&mut self) -> Result<Option<RawMessage<Self::Ack>>, QueueError>;

    /// Acknowledge a fetched message so it is not redelivered.
    async fn ack(&mut self, ack: Self::Ack) -> Result<(), QueueError>;

    /// Return an unacknowledged message to the queue.
    async fn release(&mut self, ack: Self::Ack) -> Result<(), QueueError>;

    /// Called once when the loop exits.
    async fn finish(&mut self) {}
}

pub(crate) fn spawn_pull_loop<T, C, S>(
    source: S,
    codec: C,
    queue: String,
    cancel: CancellationToken,
) -> Subscription<T>
where
    T: DeserializeOwned + Send + 'static,
    C: Codec,
    S: MessageSource,
{
    let (envelope_tx, envelopes) = mpsc::channel(STREAM_CAPACITY);
    let (error_tx, errors) = mpsc::channel(STREAM_CAPACITY);
    let handle = tokio::spawn(pull_loop(source, codec, queue, envelope_tx, error_tx, cancel));
    Subscription {
        envelopes,
        errors,
        handle,
    }
}

async fn pull_loop<T, C, S>(
    mut source: S,
    codec: C,
    queue: String,
    envelope_tx: mpsc::Sender<Envelope<T>>,
    error_tx: mpsc::Sender<QueueError>,
    cancel: CancellationToken,
) where
    T: DeserializeOwned + Send + 'static,
    C: Codec,
    S: MessageSource,
{
    tracing::debug!(queue = %queue, "Queue pull loop started");

    loop {
        if envelope_tx.is_closed() {
            break;
        }

        let fetched = tokio::select! {
            _ = cancel.cancelled() => break,
            fetched = source.fetch() => fetched,
        };

        let raw = match fetched {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                if !backoff(&cancel).await {
                    break;
                }
                continue;
            }
            Err(e) => {
                report(&error_tx, &cancel, e).await;
                if !backoff(&cancel).await {
                    break;
                }
                continue;
            }
        };

        let mut envelope: Envelope<T> = match codec.unmarshal(&raw.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Undecodable: ack, then report.
                if let Err(ack_err) = source.ack(raw.ack).await {
                    report(&error_tx, &cancel, ack_err).await;
                }
                report(&error_tx, &cancel, QueueError::Decode(e)).await;
                continue;
            }
        };
        envelope.fill_missing_id(raw.message_id.as_deref());

        let delivered = tokio::select! {
            _ = cancel.cancelled() => false,
            sent = envelope_tx.send(envelope) => sent.is_ok(),
        };
        if !delivered {
            if let Err(e) = source.release(raw.ack).await {
                tracing::warn!(queue = %queue, error = %e, "Failed to release undelivered message");
            }
            break;
        }

        if let Err(e) = source.ack(raw.ack).await {
            report(&error_tx, &cancel, e).await;
        }
    }

    source.finish().await;
    tracing::debug!(queue = %queue, "Queue pull loop stopped");
}

/// Sleep for [`POLL_BACKOFF`]. Returns `false` if cancelled first.
async fn backoff(cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(POLL_BACKOFF) => true,
    }
}

async fn report(error_tx: &mpsc::Sender<QueueError>, cancel: &CancellationToken, err: QueueError) {
    tracing::debug!(error = %err, "Queue pull error");
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = error_tx.send(err) => {}
    }
}
