//! Integration tests for the in-memory queue and the shared pull loop.

use std::time::Duration;

use assert_matches::assert_matches;
use calendar_core::{Envelope, Notification};
use calendar_queue::{Codec, JsonCodec, MemoryQueue, Queue, QueueError};
use chrono::{TimeZone, Utc};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const QUEUE: &str = "notifications";
const WAIT: Duration = Duration::from_secs(2);

fn notification(id: &str) -> Notification {
    Notification {
        event_id: id.into(),
        title: format!("event {id}"),
        event_time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
        user_id: "u1".into(),
    }
}

#[tokio::test]
async fn put_then_get_preserves_order() {
    let queue = MemoryQueue::<Notification>::new();
    for id in ["a", "b", "c"] {
        queue
            .put(QUEUE, "calendar", Envelope::new(id, notification(id)))
            .await
            .unwrap();
    }
    assert_eq!(queue.pending(QUEUE).await, 3);

    let cancel = CancellationToken::new();
    let mut sub = queue.get(QUEUE, cancel.clone()).await.unwrap();

    for id in ["a", "b", "c"] {
        let envelope = timeout(WAIT, sub.envelopes.recv()).await.unwrap().unwrap();
        assert_eq!(envelope.id, id);
        assert_eq!(envelope.body, notification(id));
    }

    cancel.cancel();
    sub.shutdown().await;
    assert_eq!(queue.pending(QUEUE).await, 0);
}

#[tokio::test]
async fn messages_published_after_subscribing_arrive() {
    let queue = MemoryQueue::<Notification>::new();
    let cancel = CancellationToken::new();
    let mut sub = queue.get(QUEUE, cancel.clone()).await.unwrap();

    // Let the loop observe an empty queue and back off at least once.
    tokio::time::sleep(Duration::from_millis(150)).await;
    queue
        .put(QUEUE, "", Envelope::new("late", notification("late")))
        .await
        .unwrap();

    let envelope = timeout(WAIT, sub.envelopes.recv()).await.unwrap().unwrap();
    assert_eq!(envelope.id, "late");
    cancel.cancel();
}

#[tokio::test]
async fn empty_envelope_id_is_filled_from_message_id() {
    let queue = MemoryQueue::<Notification>::new();
    let payload = JsonCodec.marshal(&Envelope::new("", notification("e1"))).unwrap();
    queue.push_raw(QUEUE, payload, "broker-42").await;

    let cancel = CancellationToken::new();
    let mut sub = queue.get(QUEUE, cancel.clone()).await.unwrap();
    let envelope = timeout(WAIT, sub.envelopes.recv()).await.unwrap().unwrap();
    assert_eq!(envelope.id, "broker-42");
    cancel.cancel();
}

#[tokio::test]
async fn undecodable_message_is_reported_and_skipped() {
    let queue = MemoryQueue::<Notification>::new();
    queue.push_raw(QUEUE, b"{broken".to_vec(), "bad").await;
    queue
        .put(QUEUE, "", Envelope::new("good", notification("good")))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let mut sub = queue.get(QUEUE, cancel.clone()).await.unwrap();

    let err = timeout(WAIT, sub.errors.recv()).await.unwrap().unwrap();
    assert_matches!(err, QueueError::Decode(_));

    let envelope = timeout(WAIT, sub.envelopes.recv()).await.unwrap().unwrap();
    assert_eq!(envelope.id, "good");
    assert_eq!(queue.pending(QUEUE).await, 0);
    cancel.cancel();
}

#[tokio::test]
async fn cancellation_closes_both_streams() {
    let queue = MemoryQueue::<Notification>::new();
    let cancel = CancellationToken::new();
    let mut sub = queue.get(QUEUE, cancel.clone()).await.unwrap();

    cancel.cancel();
    assert!(timeout(WAIT, sub.envelopes.recv()).await.unwrap().is_none());
    assert!(timeout(WAIT, sub.errors.recv()).await.unwrap().is_none());
    timeout(WAIT, sub.shutdown()).await.unwrap();
}

#[tokio::test]
async fn dropped_subscription_stops_the_loop_without_losing_messages() {
    let queue = MemoryQueue::<Notification>::new();
    let cancel = CancellationToken::new();
    let sub = queue.get(QUEUE, cancel.clone()).await.unwrap();
    timeout(WAIT, sub.shutdown()).await.unwrap();

    queue
        .put(QUEUE, "", Envelope::new("kept", notification("kept")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(queue.pending(QUEUE).await, 1);
}

#[tokio::test]
async fn queues_are_isolated_by_name() {
    let queue = MemoryQueue::<Notification>::new();
    queue
        .put("other", "", Envelope::new("x", notification("x")))
        .await
        .unwrap();
    assert_eq!(queue.pending(QUEUE).await, 0);
    assert_eq!(queue.pending("other").await, 1);
}

#[tokio::test]
async fn closed_queue_rejects_use_and_close_is_repeatable() {
    let queue = MemoryQueue::<Notification>::new();
    queue.close().await.unwrap();
    queue.close().await.unwrap();

    let err = queue
        .put(QUEUE, "", Envelope::new("e1", notification("e1")))
        .await
        .unwrap_err();
    assert_matches!(err, QueueError::Closed);
    assert_matches!(
        queue.get(QUEUE, CancellationToken::new()).await,
        Err(QueueError::Closed)
    );
}
