//! Scheduler and storage configuration loaded from environment variables.

use std::time::Duration;

use calendar_core::{duration, period};
use chrono::{FixedOffset, Offset, Utc};

/// Check interval used when `SCHEDULER_CHECK_INTERVAL` is unset or invalid.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Cleanup runs once a day.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub check_interval: Duration,
    pub cleanup_interval: Duration,
    /// Queue notifications are published to.
    pub queue_name: String,
    /// Exchange the queue is bound to; empty publishes to the default
    /// exchange.
    pub exchange_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            cleanup_interval: CLEANUP_INTERVAL,
            queue_name: "notifications".into(),
            exchange_name: "calendar".into(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default         |
    /// |----------------------------|-----------------|
    /// | `SCHEDULER_CHECK_INTERVAL` | `1m`            |
    /// | `EVENT_QUEUE_NAME`         | `notifications` |
    /// | `EVENT_QUEUE_EXCHANGE`     | `calendar`      |
    ///
    /// The cleanup interval is fixed at 24 hours.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            check_interval: parse_check_interval(
                std::env::var("SCHEDULER_CHECK_INTERVAL").ok().as_deref(),
            ),
            cleanup_interval: defaults.cleanup_interval,
            queue_name: std::env::var("EVENT_QUEUE_NAME").unwrap_or(defaults.queue_name),
            exchange_name: std::env::var("EVENT_QUEUE_EXCHANGE")
                .unwrap_or(defaults.exchange_name),
        }
    }
}

/// Parse a duration string such as `30s` or `1m30s`. Unset, unparsable and
/// non-positive values fall back to [`DEFAULT_CHECK_INTERVAL`].
pub fn parse_check_interval(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return DEFAULT_CHECK_INTERVAL;
    };

    match duration::parse(raw) {
        Ok(parsed) => match parsed.to_std() {
            Ok(interval) if !interval.is_zero() => interval,
            _ => {
                tracing::warn!(
                    value = %raw,
                    default_secs = DEFAULT_CHECK_INTERVAL.as_secs(),
                    "Check interval must be positive, using default"
                );
                DEFAULT_CHECK_INTERVAL
            }
        },
        Err(e) => {
            tracing::warn!(
                value = %raw,
                error = %e,
                default_secs = DEFAULT_CHECK_INTERVAL.as_secs(),
                "Invalid check interval, using default"
            );
            DEFAULT_CHECK_INTERVAL
        }
    }
}

/// Which [`EventStore`](calendar_db::EventStore) backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Required for [`StorageBackend::Sql`].
    pub database_url: Option<String>,
    /// Offset used for day/week/month boundaries.
    pub tz: FixedOffset,
}

impl StorageConfig {
    /// Load storage settings from environment variables.
    ///
    /// | Env Var                   | Default                             |
    /// |---------------------------|-------------------------------------|
    /// | `STORAGE_BACKEND`         | `sql` (`memory` also accepted)      |
    /// | `DATABASE_URL`            | -- (required for `sql`)             |
    /// | `STORAGE_TIMEZONE_OFFSET` | `+00:00`                            |
    pub fn from_env() -> Self {
        Self {
            backend: parse_backend(std::env::var("STORAGE_BACKEND").ok().as_deref()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            tz: parse_tz(std::env::var("STORAGE_TIMEZONE_OFFSET").ok().as_deref()),
        }
    }
}

pub fn parse_backend(raw: Option<&str>) -> StorageBackend {
    match raw.map(str::trim) {
        None | Some("") => StorageBackend::Sql,
        Some(v) if v.eq_ignore_ascii_case("sql") || v.eq_ignore_ascii_case("postgres") => {
            StorageBackend::Sql
        }
        Some(v) if v.eq_ignore_ascii_case("memory") => StorageBackend::Memory,
        Some(v) => {
            tracing::warn!(value = %v, "Unknown storage backend, using sql");
            StorageBackend::Sql
        }
    }
}

pub fn parse_tz(raw: Option<&str>) -> FixedOffset {
    let utc = Utc.fix();
    match raw {
        None => utc,
        Some(v) => period::parse_offset(v).unwrap_or_else(|e| {
            tracing::warn!(value = %v, error = %e, "Invalid time zone offset, using UTC");
            utc
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_interval_defaults_to_one_minute() {
        assert_eq!(parse_check_interval(None), Duration::from_secs(60));
    }

    #[test]
    fn check_interval_accepts_duration_strings() {
        assert_eq!(parse_check_interval(Some("30s")), Duration::from_secs(30));
        assert_eq!(parse_check_interval(Some("1m30s")), Duration::from_secs(90));
        assert_eq!(parse_check_interval(Some("250ms")), Duration::from_millis(250));
    }

    #[test]
    fn bad_check_interval_falls_back() {
        assert_eq!(parse_check_interval(Some("soon")), DEFAULT_CHECK_INTERVAL);
        assert_eq!(parse_check_interval(Some("0s")), DEFAULT_CHECK_INTERVAL);
        assert_eq!(parse_check_interval(Some("-5m")), DEFAULT_CHECK_INTERVAL);
    }

    #[test]
    fn backend_selection() {
        assert_eq!(parse_backend(None), StorageBackend::Sql);
        assert_eq!(parse_backend(Some("memory")), StorageBackend::Memory);
        assert_eq!(parse_backend(Some("SQL")), StorageBackend::Sql);
        assert_eq!(parse_backend(Some("redis")), StorageBackend::Sql);
    }

    #[test]
    fn tz_parsing_falls_back_to_utc() {
        assert_eq!(parse_tz(None).local_minus_utc(), 0);
        assert_eq!(parse_tz(Some("+03:00")).local_minus_utc(), 3 * 3600);
        assert_eq!(parse_tz(Some("nowhere")).local_minus_utc(), 0);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = SchedulerConfig::default();
        assert_eq!(config.cleanup_interval, Duration::from_secs(86_400));
        assert_eq!(config.queue_name, "notifications");
        assert_eq!(config.exchange_name, "calendar");
    }
}
