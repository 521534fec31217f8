//! Integration tests for the PostgreSQL event store.
//!
//! Each test gets a fresh database with migrations applied. Covers:
//! - CRUD, duplicate ids under concurrent writers
//! - Listings in the store's offset
//! - Both bounds of the due window and `mark_notified`
//! - Calendar-year retention and out-of-range rejection

use std::sync::Arc;

use assert_matches::assert_matches;
use calendar_core::types::Timestamp;
use calendar_core::Event;
use calendar_db::{EventStore, MarkOutcome, PgEventStore, StoreError};
use chrono::{Duration, FixedOffset, TimeZone, Utc};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn store(pool: PgPool) -> PgEventStore {
    PgEventStore::new(pool, FixedOffset::east_opt(0).unwrap())
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn event(id: &str, start: Timestamp) -> Event {
    Event::new(id, format!("title {id}"), start, Duration::minutes(90), "user-1")
}

fn ids(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn crud_round_trip(pool: PgPool) {
    let store = store(pool);
    let e = event("e1", at(2024, 3, 4, 9, 0))
        .with_description("agenda")
        .with_notify_before(Duration::minutes(15));

    store.add(e.clone()).await.unwrap();
    assert_eq!(store.get_by_id("e1").await.unwrap(), e);

    assert_matches!(
        store.add(event("e1", at(2025, 1, 1, 0, 0))).await,
        Err(StoreError::DuplicateId { .. })
    );
    assert_eq!(store.get_by_id("e1").await.unwrap(), e);

    let mut moved = e.clone();
    moved.start_time = at(2024, 3, 5, 9, 0);
    store.update(moved.clone()).await.unwrap();
    assert_eq!(store.get_by_id("e1").await.unwrap(), moved);

    assert_matches!(
        store.update(event("nope", at(2024, 3, 4, 9, 0))).await,
        Err(StoreError::NotFound { .. })
    );

    store.delete("e1").await.unwrap();
    store.delete("e1").await.unwrap();
    assert_matches!(store.get_by_id("e1").await, Err(StoreError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn week_listing_is_ordered(pool: PgPool) {
    let store = store(pool);
    store.add(event("wed", at(2024, 3, 6, 10, 0))).await.unwrap();
    store.add(event("mon", at(2024, 3, 4, 0, 0))).await.unwrap();
    store.add(event("next-mon", at(2024, 3, 11, 0, 0))).await.unwrap();

    let week = store.list_for_week(at(2024, 3, 6, 12, 0)).await.unwrap();
    assert_eq!(ids(&week), vec!["mon", "wed"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn day_listing_uses_store_offset(pool: PgPool) {
    let store = PgEventStore::new(pool, FixedOffset::east_opt(3 * 3600).unwrap());
    // 22:30 UTC on March 5 is 01:30 on March 6 at +03:00.
    store.add(event("late", at(2024, 3, 5, 22, 30))).await.unwrap();
    store.add(event("early", at(2024, 3, 5, 20, 30))).await.unwrap();

    let day = store.list_for_day(at(2024, 3, 6, 6, 0)).await.unwrap();
    assert_eq!(ids(&day), vec!["late"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_adds_of_one_id_admit_exactly_one(pool: PgPool) {
    let store = Arc::new(store(pool));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.add(event("shared", at(2024, 3, 4, 9, 0))).await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => ok += 1,
            Err(err) => assert_matches!(err, StoreError::DuplicateId { .. }),
        }
    }
    assert_eq!(ok, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn due_then_marked(pool: PgPool) {
    let store = store(pool);
    let t = at(2024, 6, 1, 12, 0);
    let thirty = Duration::minutes(30);
    store
        .add(event("in", t + Duration::minutes(29)).with_notify_before(thirty))
        .await
        .unwrap();
    store
        .add(event("upper", t + Duration::minutes(31)).with_notify_before(thirty))
        .await
        .unwrap();
    store
        .add(event("out", t + Duration::minutes(32)).with_notify_before(thirty))
        .await
        .unwrap();

    let due = store.get_due_for_notification(t).await.unwrap();
    assert_eq!(ids(&due), vec!["in", "upper"]);

    assert_eq!(store.mark_notified("in").await.unwrap(), MarkOutcome::Marked);
    assert_eq!(store.mark_notified("upper").await.unwrap(), MarkOutcome::Marked);
    assert!(store.get_due_for_notification(t).await.unwrap().is_empty());
    assert_eq!(
        store.mark_notified("ghost").await.unwrap(),
        MarkOutcome::AlreadyGone
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn purge_honours_retention(pool: PgPool) {
    let store = store(pool);
    let now = at(2024, 6, 1, 12, 0);
    store
        .add(Event::new("old", "t", now - Duration::days(400), Duration::zero(), "u"))
        .await
        .unwrap();
    store
        .add(Event::new("recent", "t", now - Duration::days(300), Duration::zero(), "u"))
        .await
        .unwrap();

    assert_eq!(store.purge_expired(now).await.unwrap(), 1);
    assert!(store.get_by_id("recent").await.is_ok());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn purge_keeps_event_within_one_calendar_year(pool: PgPool) {
    let store = store(pool);
    let now = at(2024, 6, 1, 12, 0);
    // Ends 365.75 days before `now`; 2024 is a leap year.
    store
        .add(Event::new("kept", "t", at(2023, 6, 1, 17, 0), Duration::hours(1), "u"))
        .await
        .unwrap();

    assert_eq!(store.purge_expired(now).await.unwrap(), 0);
    assert!(store.get_by_id("kept").await.is_ok());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn out_of_range_span_is_rejected_before_reaching_sql(pool: PgPool) {
    let store = store(pool);
    let now = at(2024, 6, 1, 12, 0);
    let err = store
        .add(event("far", now).with_notify_before(Duration::days(300_000 * 365)))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::InvalidEvent(_));

    assert!(store.get_due_for_notification(now).await.unwrap().is_empty());
    assert_matches!(store.get_by_id("far").await, Err(StoreError::NotFound { .. }));
}
