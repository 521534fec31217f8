#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: &'static str },

    #[error("Invalid UTC offset {0:?}, expected [+-]HH:MM")]
    InvalidOffset(String),

    #[error("Event {id}: {field} is outside the supported date range")]
    OutOfRange { id: String, field: &'static str },
}
