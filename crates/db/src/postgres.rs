//! PostgreSQL [`EventStore`] backend.
//!
//! Every operation is a single autocommit statement issued through
//! [`EventRepo`]; concurrent writers are serialized by the database's own
//! row locking.

use async_trait::async_trait;
use calendar_core::period::CalendarPeriod;
use calendar_core::types::Timestamp;
use calendar_core::window::{self, DueWindow};
use calendar_core::Event;
use chrono::FixedOffset;

use crate::error::StoreError;
use crate::models::event::EventRow;
use crate::repositories::EventRepo;
use crate::store::{EventStore, MarkOutcome};
use crate::DbPool;

pub struct PgEventStore {
    pool: DbPool,
    tz: FixedOffset,
}

impl PgEventStore {
    /// Wrap an existing pool. Calendar periods are evaluated in `tz`.
    pub fn new(pool: DbPool, tz: FixedOffset) -> Self {
        Self { pool, tz }
    }

    /// Connect to `database_url` and verify the connection.
    pub async fn connect(database_url: &str, tz: FixedOffset) -> Result<Self, StoreError> {
        let pool = crate::create_pool(database_url)
            .await
            .map_err(StoreError::Connection)?;
        crate::health_check(&pool)
            .await
            .map_err(StoreError::Connection)?;
        Ok(Self::new(pool, tz))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn add(&self, event: Event) -> Result<(), StoreError> {
        event.validate()?;
        let inserted = EventRepo::insert(&self.pool, &EventRow::from(&event)).await?;
        if !inserted {
            return Err(StoreError::DuplicateId { id: event.id });
        }
        Ok(())
    }

    async fn update(&self, event: Event) -> Result<(), StoreError> {
        event.validate()?;
        let updated = EventRepo::update(&self.pool, &EventRow::from(&event)).await?;
        if !updated {
            return Err(StoreError::NotFound { id: event.id });
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        EventRepo::delete(&self.pool, id).await?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Event, StoreError> {
        EventRepo::find_by_id(&self.pool, id)
            .await?
            .map(Event::from)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn list_for_period(
        &self,
        period: CalendarPeriod,
        date: Timestamp,
    ) -> Result<Vec<Event>, StoreError> {
        let (start, end) = period.bounds(date, self.tz);
        let rows = EventRepo::list_starting_between(&self.pool, start, end).await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn get_due_for_notification(&self, now: Timestamp) -> Result<Vec<Event>, StoreError> {
        let window = DueWindow::around(now);
        let rows = EventRepo::list_due(&self.pool, window.from, window.to).await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn mark_notified(&self, id: &str) -> Result<MarkOutcome, StoreError> {
        if EventRepo::clear_notify_before(&self.pool, id).await? {
            Ok(MarkOutcome::Marked)
        } else {
            tracing::warn!(event_id = %id, "No event found to mark as notified");
            Ok(MarkOutcome::AlreadyGone)
        }
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let deleted =
            EventRepo::delete_ended_before(&self.pool, window::retention_cutoff(now)).await?;
        Ok(deleted)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}
