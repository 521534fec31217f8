//! Event storage for the notification pipeline.
//!
//! [`EventStore`] is the contract the scheduler and the application layer
//! program against. Two backends implement it:
//!
//! - [`MemoryEventStore`]: a map behind a reader/writer lock.
//! - [`PgEventStore`]: the `events` table in PostgreSQL, queried through
//!   [`repositories::EventRepo`].

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;
pub use store::{EventStore, MarkOutcome};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
