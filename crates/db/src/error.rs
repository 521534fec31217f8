/// Errors surfaced by [`EventStore`](crate::EventStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Event not found: {id}")]
    NotFound { id: String },

    #[error("Event already exists: {id}")]
    DuplicateId { id: String },

    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] calendar_core::CoreError),

    /// The backend could not be reached (pool exhausted, socket error, TLS).
    #[error("Database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::Connection(err),
            other => StoreError::Database(other),
        }
    }
}
