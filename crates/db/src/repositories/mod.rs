//! Repository layer: one zero-sized struct per table, async functions over
//! a [`PgPool`](sqlx::PgPool).

pub mod event_repo;

pub use event_repo::EventRepo;
