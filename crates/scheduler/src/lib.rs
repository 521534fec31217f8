//! Notification scheduler.
//!
//! Periodically selects due events from an [`EventStore`], publishes one
//! [`Notification`] envelope per event and marks the event as notified.
//! A second, slower tick purges events past the retention window.
//!
//! [`EventStore`]: calendar_db::EventStore
//! [`Notification`]: calendar_core::Notification

pub mod config;
pub mod scheduler;

pub use config::{SchedulerConfig, StorageBackend, StorageConfig};
pub use scheduler::{open_store, DispatchReport, Scheduler, StartupError};
