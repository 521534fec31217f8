//! Repository for the `events` table.

use calendar_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::event::EventRow;

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

const EVENT_COLUMNS: &str = "\
    id, title, description, start_time, duration_ms, user_id, notify_before_ms";

/// Provides read/write operations for calendar events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event. Returns `false` when the id already exists, in
    /// which case the stored row is not modified.
    pub async fn insert(pool: &PgPool, row: &EventRow) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO events \
                (id, title, description, start_time, duration_ms, user_id, notify_before_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&row.id)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.start_time)
        .bind(row.duration_ms)
        .bind(&row.user_id)
        .bind(row.notify_before_ms)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Overwrite every column of an existing event. Returns `false` if no
    /// row matched.
    pub async fn update(pool: &PgPool, row: &EventRow) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE events \
             SET title = $2, description = $3, start_time = $4, duration_ms = $5, \
                 user_id = $6, notify_before_ms = $7 \
             WHERE id = $1",
        )
        .bind(&row.id)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.start_time)
        .bind(row.duration_ms)
        .bind(&row.user_id)
        .bind(row.notify_before_ms)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete by id, returning the number of removed rows (0 or 1).
    pub async fn delete(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<EventRow>, sqlx::Error> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Events with `from <= start_time < to`, earliest first.
    pub async fn list_starting_between(
        pool: &PgPool,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<EventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE start_time >= $1 AND start_time < $2 \
             ORDER BY start_time, id"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Events still awaiting a notification whose notification instant
    /// (`start_time - notify_before`) lies in `[from, to]`, earliest start
    /// first.
    pub async fn list_due(
        pool: &PgPool,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<EventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE notify_before_ms > 0 \
               AND start_time - notify_before_ms * INTERVAL '1 millisecond' BETWEEN $1 AND $2 \
             ORDER BY start_time, id"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Reset `notify_before_ms` to zero. Returns `false` if the event is gone.
    pub async fn clear_notify_before(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE events SET notify_before_ms = 0 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete events whose end (`start_time + duration`) is before `cutoff`.
    pub async fn delete_ended_before(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM events \
             WHERE start_time + duration_ms * INTERVAL '1 millisecond' < $1",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
