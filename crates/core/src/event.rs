//! Calendar event record and the notification derived from it.

use chrono::{Datelike, Duration};
use serde::{Deserialize, Serialize};

use crate::duration;
use crate::error::CoreError;
use crate::types::{EventId, Timestamp};

/// Calendar years accepted for an event's start, end and notification
/// instant. Both backends can represent and compute on every instant in it.
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// A calendar event as held by an event store.
///
/// `notify_before` doubles as the notification state: a positive value means
/// "notify this long before `start_time`", while zero means the notification
/// was already dispatched or was never requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: Timestamp,
    #[serde(with = "duration::serde_string")]
    pub duration: Duration,
    pub user_id: String,
    #[serde(with = "duration::serde_string")]
    pub notify_before: Duration,
}

impl Event {
    /// Create an event with no description and notifications disabled.
    pub fn new(
        id: impl Into<EventId>,
        title: impl Into<String>,
        start_time: Timestamp,
        duration: Duration,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            start_time,
            duration,
            user_id: user_id.into(),
            notify_before: Duration::zero(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Request a notification `notify_before` ahead of the start.
    pub fn with_notify_before(mut self, notify_before: Duration) -> Self {
        self.notify_before = notify_before;
        self
    }

    /// Whether a notification is still pending for this event.
    pub fn wants_notification(&self) -> bool {
        self.notify_before > Duration::zero()
    }

    /// The instant at which the notification should go out, or `None` when
    /// it is not representable.
    pub fn notify_at(&self) -> Option<Timestamp> {
        self.start_time.checked_sub_signed(self.notify_before)
    }

    /// The instant at which the event is over, or `None` when it is not
    /// representable.
    pub fn end_time(&self) -> Option<Timestamp> {
        self.start_time.checked_add_signed(self.duration)
    }

    /// Check that every instant derived from the event lies within
    /// [`SUPPORTED_YEARS`].
    pub fn validate(&self) -> Result<(), CoreError> {
        self.check_instant("start_time", Some(self.start_time))?;
        self.check_instant("end_time", self.end_time())?;
        if self.notify_before != Duration::zero() {
            self.check_instant("notify_at", self.notify_at())?;
        }
        Ok(())
    }

    fn check_instant(&self, field: &'static str, at: Option<Timestamp>) -> Result<(), CoreError> {
        match at {
            Some(at) if SUPPORTED_YEARS.contains(&at.year()) => Ok(()),
            _ => Err(CoreError::OutOfRange {
                id: self.id.clone(),
                field,
            }),
        }
    }

    /// Project the event into the notification handed to the queue.
    pub fn to_notification(&self) -> Notification {
        Notification {
            event_id: self.id.clone(),
            title: self.title.clone(),
            event_time: self.start_time,
            user_id: self.user_id.clone(),
        }
    }
}

/// Message body published for a due event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event_id: EventId,
    pub title: String,
    pub event_time: Timestamp,
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample() -> Event {
        Event::new(
            "e1",
            "Standup",
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap(),
            Duration::minutes(15),
            "user-1",
        )
    }

    #[test]
    fn new_event_has_notifications_disabled() {
        let event = sample();
        assert!(!event.wants_notification());
        assert_eq!(event.notify_before, Duration::zero());
        assert!(event.description.is_empty());
    }

    #[test]
    fn notify_at_and_end_time() {
        let event = sample().with_notify_before(Duration::minutes(10));
        assert!(event.wants_notification());
        assert_eq!(
            event.notify_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 9, 20, 0).unwrap())
        );
        assert_eq!(
            event.end_time(),
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 9, 45, 0).unwrap())
        );
    }

    #[test]
    fn overflowing_spans_have_no_instant() {
        let event = sample().with_notify_before(Duration::days(300_000 * 365));
        assert_eq!(event.notify_at(), None);

        let mut long = sample();
        long.duration = Duration::days(300_000 * 365);
        assert_eq!(long.end_time(), None);
    }

    #[test]
    fn validate_accepts_ordinary_events() {
        sample().validate().unwrap();
        sample()
            .with_notify_before(Duration::minutes(-5))
            .validate()
            .unwrap();
    }

    #[test]
    fn validate_rejects_instants_outside_supported_years() {
        let err = sample()
            .with_notify_before(Duration::days(300_000 * 365))
            .validate()
            .unwrap_err();
        assert_matches!(err, CoreError::OutOfRange { field: "notify_at", .. });

        let mut long = sample();
        long.duration = Duration::days(10_000 * 365);
        assert_matches!(
            long.validate(),
            Err(CoreError::OutOfRange { field: "end_time", .. })
        );

        let mut ancient = sample();
        ancient.start_time = Utc.with_ymd_and_hms(-50, 1, 1, 0, 0, 0).unwrap();
        assert_matches!(
            ancient.validate(),
            Err(CoreError::OutOfRange { field: "start_time", .. })
        );
    }

    #[test]
    fn negative_notify_before_is_not_pending() {
        let event = sample().with_notify_before(Duration::minutes(-5));
        assert!(!event.wants_notification());
    }

    #[test]
    fn notification_projects_event_fields() {
        let event = sample().with_description("daily sync");
        let n = event.to_notification();
        assert_eq!(n.event_id, "e1");
        assert_eq!(n.title, "Standup");
        assert_eq!(n.event_time, event.start_time);
        assert_eq!(n.user_id, "user-1");
    }

    #[test]
    fn event_json_uses_duration_strings() {
        let event = sample().with_notify_before(Duration::minutes(30));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["duration"], "15m0s");
        assert_eq!(json["notify_before"], "30m0s");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn event_json_rejects_bad_duration() {
        let json = serde_json::json!({
            "id": "e1",
            "title": "t",
            "start_time": "2024-03-04T09:30:00Z",
            "duration": "forever",
            "user_id": "u",
            "notify_before": "0s",
        });
        assert!(serde_json::from_value::<Event>(json).is_err());
    }
}
