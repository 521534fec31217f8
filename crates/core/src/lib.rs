//! Domain types and time arithmetic shared by the notification pipeline.
//!
//! - [`event`]: the stored [`Event`] record and its [`Notification`]
//!   projection.
//! - [`envelope`]: the generic [`Envelope`] exchanged through queues.
//! - [`duration`]: duration strings such as `"1h30m0s"`.
//! - [`period`]: calendar day / ISO week / month bounds in a fixed offset.
//! - [`window`]: the due-for-notification window and retention cutoff.

pub mod duration;
pub mod envelope;
pub mod error;
pub mod event;
pub mod period;
pub mod types;
pub mod window;

pub use envelope::Envelope;
pub use error::CoreError;
pub use event::{Event, Notification};
