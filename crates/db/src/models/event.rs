//! Row model for the `events` table.

use calendar_core::types::Timestamp;
use calendar_core::Event;
use chrono::Duration;
use sqlx::FromRow;

/// A row from the `events` table. Durations are signed milliseconds; a
/// positive sub-millisecond `notify_before` is stored as 1 ms so it stays
/// pending.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_time: Timestamp,
    pub duration_ms: i64,
    pub user_id: String,
    pub notify_before_ms: i64,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            duration: Duration::milliseconds(row.duration_ms),
            user_id: row.user_id,
            notify_before: Duration::milliseconds(row.notify_before_ms),
        }
    }
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        EventRow {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            start_time: event.start_time,
            duration_ms: event.duration.num_milliseconds(),
            user_id: event.user_id.clone(),
            notify_before_ms: pending_ms(event.notify_before),
        }
    }
}

fn pending_ms(span: Duration) -> i64 {
    match span.num_milliseconds() {
        0 if span > Duration::zero() => 1,
        ms => ms,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn row_conversion_preserves_fields() {
        let event = Event::new(
            "e1",
            "Review",
            Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap(),
            Duration::minutes(45),
            "u1",
        )
        .with_description("quarterly")
        .with_notify_before(Duration::minutes(-5));

        let row = EventRow::from(&event);
        assert_eq!(row.duration_ms, 45 * 60 * 1000);
        assert_eq!(row.notify_before_ms, -5 * 60 * 1000);
        assert_eq!(Event::from(row), event);
    }

    #[test]
    fn sub_millisecond_notify_before_stays_pending() {
        let event = Event::new(
            "e2",
            "Ping",
            Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap(),
            Duration::zero(),
            "u1",
        )
        .with_notify_before(Duration::microseconds(500));

        let row = EventRow::from(&event);
        assert_eq!(row.notify_before_ms, 1);
        assert!(Event::from(row).wants_notification());

        let negative = event.with_notify_before(Duration::microseconds(-500));
        assert_eq!(EventRow::from(&negative).notify_before_ms, 0);
    }
}
