/// Events are keyed by an opaque, caller-assigned string (usually a UUID).
pub type EventId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
