//! In-memory [`EventStore`] backend.
//!
//! All events live in a single `HashMap` guarded by one
//! [`tokio::sync::RwLock`]: queries take the read lock, mutations the write
//! lock, and the lock is released before returning to the caller.

use std::collections::HashMap;

use async_trait::async_trait;
use calendar_core::period::CalendarPeriod;
use calendar_core::types::{EventId, Timestamp};
use calendar_core::window::{self, DueWindow};
use calendar_core::Event;
use chrono::{Duration, FixedOffset, Offset, Utc};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{EventStore, MarkOutcome};

pub struct MemoryEventStore {
    events: RwLock<HashMap<EventId, Event>>,
    tz: FixedOffset,
}

impl MemoryEventStore {
    /// Create an empty store that evaluates calendar periods in UTC.
    pub fn new() -> Self {
        Self::with_offset(Utc.fix())
    }

    /// Create an empty store that evaluates calendar periods in `tz`.
    pub fn with_offset(tz: FixedOffset) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            tz,
        }
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_by_start(events: &mut [Event]) {
    events.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn add(&self, event: Event) -> Result<(), StoreError> {
        event.validate()?;
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Err(StoreError::DuplicateId { id: event.id });
        }
        events.insert(event.id.clone(), event);
        Ok(())
    }

    async fn update(&self, event: Event) -> Result<(), StoreError> {
        event.validate()?;
        let mut events = self.events.write().await;
        match events.get_mut(&event.id) {
            Some(existing) => {
                *existing = event;
                Ok(())
            }
            None => Err(StoreError::NotFound { id: event.id }),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.events.write().await.remove(id);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Event, StoreError> {
        self.events
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn list_for_period(
        &self,
        period: CalendarPeriod,
        date: Timestamp,
    ) -> Result<Vec<Event>, StoreError> {
        let (start, end) = period.bounds(date, self.tz);
        let mut found: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| start <= e.start_time && e.start_time < end)
            .cloned()
            .collect();
        sort_by_start(&mut found);
        Ok(found)
    }

    async fn get_due_for_notification(&self, now: Timestamp) -> Result<Vec<Event>, StoreError> {
        let window = DueWindow::around(now);
        let mut due: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| window.is_due(e))
            .cloned()
            .collect();
        sort_by_start(&mut due);
        Ok(due)
    }

    async fn mark_notified(&self, id: &str) -> Result<MarkOutcome, StoreError> {
        let mut events = self.events.write().await;
        match events.get_mut(id) {
            Some(event) => {
                event.notify_before = Duration::zero();
                Ok(MarkOutcome::Marked)
            }
            None => Ok(MarkOutcome::AlreadyGone),
        }
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|_, e| !window::is_expired(e, now));
        Ok((before - events.len()) as u64)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.events.write().await.clear();
        Ok(())
    }
}
