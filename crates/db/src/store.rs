//! The storage contract shared by all event store backends.

use async_trait::async_trait;
use calendar_core::period::CalendarPeriod;
use calendar_core::types::Timestamp;
use calendar_core::Event;

use crate::error::StoreError;

/// Result of [`EventStore::mark_notified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// `notify_before` was reset to zero.
    Marked,
    /// No event with that id exists any more (deleted concurrently).
    AlreadyGone,
}

/// CRUD, calendar listings and the notification queries over [`Event`]s.
///
/// Listings are ordered by `start_time` ascending in every backend.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Store a new event. Fails with [`StoreError::DuplicateId`] when the id
    /// is taken; the existing record is left untouched.
    async fn add(&self, event: Event) -> Result<(), StoreError>;

    /// Replace an existing event. Fails with [`StoreError::NotFound`].
    async fn update(&self, event: Event) -> Result<(), StoreError>;

    /// Remove an event. Removing an unknown id succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Event, StoreError>;

    /// Events starting within the calendar period that contains `date`, in
    /// the store's time zone.
    async fn list_for_period(
        &self,
        period: CalendarPeriod,
        date: Timestamp,
    ) -> Result<Vec<Event>, StoreError>;

    async fn list_for_day(&self, date: Timestamp) -> Result<Vec<Event>, StoreError> {
        self.list_for_period(CalendarPeriod::Day, date).await
    }

    async fn list_for_week(&self, date: Timestamp) -> Result<Vec<Event>, StoreError> {
        self.list_for_period(CalendarPeriod::Week, date).await
    }

    async fn list_for_month(&self, date: Timestamp) -> Result<Vec<Event>, StoreError> {
        self.list_for_period(CalendarPeriod::Month, date).await
    }

    /// Events with `notify_before > 0` whose notification instant lies in
    /// `[now - 1m, now + 1m]`, ordered by `start_time`.
    async fn get_due_for_notification(&self, now: Timestamp) -> Result<Vec<Event>, StoreError>;

    /// Reset `notify_before` to zero so the event is never selected again.
    async fn mark_notified(&self, id: &str) -> Result<MarkOutcome, StoreError>;

    /// Delete events that ended more than a year before `now`. Returns the
    /// number of deleted events.
    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError>;

    /// Release backend resources. Calling it twice is harmless.
    async fn close(&self) -> Result<(), StoreError>;
}
