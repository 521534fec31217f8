//! The due-for-notification window and the retention cutoff.

use chrono::{DateTime, Duration, Months, Utc};

use crate::event::Event;
use crate::types::Timestamp;

/// Half-width of the due window around "now", in seconds. Tolerates
/// scheduler jitter.
pub const DUE_WINDOW_SLACK_SECS: i64 = 60;

/// Events that ended more than this many calendar months ago are purged.
pub const RETENTION_MONTHS: u32 = 12;

/// Closed interval `[now - 60s, now + 60s]` a notification instant must fall
/// in for its event to be due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl DueWindow {
    pub fn around(now: Timestamp) -> Self {
        Self {
            from: now - Duration::seconds(DUE_WINDOW_SLACK_SECS),
            to: now + Duration::seconds(DUE_WINDOW_SLACK_SECS),
        }
    }

    /// An event is due when it still wants a notification and its
    /// notification instant lies inside the window (bounds included).
    pub fn is_due(&self, event: &Event) -> bool {
        if !event.wants_notification() {
            return false;
        }
        event
            .notify_at()
            .is_some_and(|at| self.from <= at && at <= self.to)
    }
}

/// Events whose end lies strictly before this instant are expired.
///
/// One calendar year back from `now`. A Feb 29 `now` maps to Feb 28.
pub fn retention_cutoff(now: Timestamp) -> Timestamp {
    now.checked_sub_months(Months::new(RETENTION_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn is_expired(event: &Event, now: Timestamp) -> bool {
    let cutoff = retention_cutoff(now);
    event.end_time().is_some_and(|end| end < cutoff)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
