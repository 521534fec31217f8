//! In-process [`Queue`] backend.
//!
//! Named FIFO queues of encoded payloads behind a [`tokio::sync::Mutex`].
//! Payloads go through the same [`Codec`] and the same pull loop as the
//! broker backend, so consumers observe identical behaviour. Exchanges are
//! accepted and ignored.

use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use calendar_core::Envelope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::codec::{Codec, JsonCodec};
use crate::error::QueueError;
use crate::queue::{spawn_pull_loop, MessageSource, Queue, RawMessage, Subscription};

#[derive(Debug, Clone)]
struct StoredMessage {
    payload: Vec<u8>,
    message_id: String,
}

#[derive(Default)]
struct Shared {
    queues: Mutex<HashMap<String, VecDeque<StoredMessage>>>,
    closed: AtomicBool,
    next_id: AtomicU64,
}

pub struct MemoryQueue<T, C = JsonCodec> {
    shared: Arc<Shared>,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MemoryQueue<T, JsonCodec> {
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl<T> Default for MemoryQueue<T, JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Codec + Clone> MemoryQueue<T, C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            codec,
            _marker: PhantomData,
        }
    }

    /// Number of messages waiting in `queue`.
    pub async fn pending(&self, queue: &str) -> usize {
        self.shared
            .queues
            .lock()
            .await
            .get(queue)
            .map_or(0, VecDeque::len)
    }

    /// Append an already-encoded payload to `queue`. An empty `message_id`
    /// is replaced by a generated one, like a broker would assign.
    pub async fn push_raw(&self, queue: &str, payload: Vec<u8>, message_id: &str) {
        let message_id = if message_id.is_empty() {
            let n = self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            format!("mem-{n}")
        } else {
            message_id.to_string()
        };
        self.shared
            .queues
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(StoredMessage {
                payload,
                message_id,
            });
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl<T, C> Queue<T> for MemoryQueue<T, C>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    C: Codec + Clone,
{
    async fn put(
        &self,
        queue: &str,
        _exchange: &str,
        envelope: Envelope<T>,
    ) -> Result<(), QueueError> {
        self.ensure_open()?;
        let payload = self.codec.marshal(&envelope).map_err(QueueError::Encode)?;
        self.push_raw(queue, payload, &envelope.id).await;
        Ok(())
    }

    async fn get(
        &self,
        queue: &str,
        cancel: CancellationToken,
    ) -> Result<Subscription<T>, QueueError> {
        self.ensure_open()?;
        let source = MemorySource {
            shared: Arc::clone(&self.shared),
            queue: queue.to_string(),
        };
        Ok(spawn_pull_loop(
            source,
            self.codec.clone(),
            queue.to_string(),
            cancel,
        ))
    }

    async fn close(&self) -> Result<(), QueueError> {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            self.shared.queues.lock().await.clear();
        }
        Ok(())
    }
}

struct MemorySource {
    shared: Arc<Shared>,
    queue: String,
}

#[async_trait]
impl MessageSource for MemorySource {
    type Ack = StoredMessage;

    async fn fetch(&mut self) -> Result<Option<RawMessage<StoredMessage>>, QueueError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        let mut queues = self.shared.queues.lock().await;
        Ok(queues
            .get_mut(&self.queue)
            .and_then(VecDeque::pop_front)
            .map(|msg| RawMessage {
                payload: msg.payload.clone(),
                message_id: Some(msg.message_id.clone()),
                ack: msg,
            }))
    }

    async fn ack(&mut self, _ack: StoredMessage) -> Result<(), QueueError> {
        Ok(())
    }

    async fn release(&mut self, ack: StoredMessage) -> Result<(), QueueError> {
        self.shared
            .queues
            .lock()
            .await
            .entry(self.queue.clone())
            .or_default()
            .push_front(ack);
        Ok(())
    }
}
