//! The scheduler control loop.
//!
//! Two tickers drive the loop: the check tick selects due events and
//! publishes them, the cleanup tick purges expired events. Neither fires at
//! start-up and missed ticks are delayed rather than replayed, so tick bodies
//! never overlap.
//!
//! Delivery is at-least-once: an event is marked only after its envelope
//! was published, and an event whose publish or mark failed stays eligible
//! for the next tick that still covers its notification instant.

use std::sync::Arc;

use calendar_core::types::Timestamp;
use calendar_core::{Envelope, Notification};
use calendar_db::{EventStore, MarkOutcome, MemoryEventStore, PgEventStore, StoreError};
use calendar_queue::Queue;
use chrono::Utc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{SchedulerConfig, StorageBackend, StorageConfig};

/// Outcome of one check tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events returned by the due query.
    pub due: usize,
    pub published: usize,
    pub marked: usize,
    pub publish_failures: usize,
    pub mark_failures: usize,
    /// The due query itself failed; nothing was attempted.
    pub query_failed: bool,
}

pub struct Scheduler {
    store: Arc<dyn EventStore>,
    queue: Arc<dyn Queue<Notification>>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn EventStore>,
        queue: Arc<dyn Queue<Notification>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Publish a notification for every event due at `now`, in start-time
    /// order, marking each one after its publish succeeds.
    pub async fn check_and_dispatch(&self, now: Timestamp) -> DispatchReport {
        let mut report = DispatchReport::default();

        let due = match self.store.get_due_for_notification(now).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query due events");
                report.query_failed = true;
                return report;
            }
        };
        report.due = due.len();

        for event in due {
            let envelope = Envelope::new(event.id.clone(), event.to_notification());
            if let Err(e) = self
                .queue
                .put(&self.config.queue_name, &self.config.exchange_name, envelope)
                .await
            {
                tracing::error!(event_id = %event.id, error = %e, "Failed to publish notification");
                report.publish_failures += 1;
                continue;
            }
            report.published += 1;

            match self.store.mark_notified(&event.id).await {
                Ok(MarkOutcome::Marked) => {
                    report.marked += 1;
                    tracing::info!(
                        event_id = %event.id,
                        user_id = %event.user_id,
                        start_time = %event.start_time,
                        "Notification dispatched"
                    );
                }
                Ok(MarkOutcome::AlreadyGone) => {
                    tracing::warn!(event_id = %event.id, "Event deleted before it could be marked");
                }
                Err(e) => {
                    tracing::error!(
                        event_id = %event.id,
                        error = %e,
                        "Failed to mark event as notified"
                    );
                    report.mark_failures += 1;
                }
            }
        }

        if report.due > 0 {
            tracing::debug!(?report, "Check tick complete");
        }
        report
    }

    /// Delete events that ended before the retention cutoff.
    pub async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        match self.store.purge_expired(now).await {
            Ok(deleted) => {
                if deleted > 0 {
                    tracing::info!(deleted, "Purged expired events");
                } else {
                    tracing::debug!("No expired events to purge");
                }
                Ok(deleted)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to purge expired events");
                Err(e)
            }
        }
    }

    /// Run both tickers until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let start = Instant::now();
        let mut check = interval_at(start + self.config.check_interval, self.config.check_interval);
        check.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cleanup = interval_at(
            start + self.config.cleanup_interval,
            self.config.cleanup_interval,
        );
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            check_interval_ms = self.config.check_interval.as_millis() as u64,
            cleanup_interval_secs = self.config.cleanup_interval.as_secs(),
            queue = %self.config.queue_name,
            exchange = %self.config.exchange_name,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler stopping");
                    break;
                }
                _ = check.tick() => {
                    self.check_and_dispatch(Utc::now()).await;
                }
                _ = cleanup.tick() => {
                    // Logged inside; the next tick retries.
                    self.purge_expired(Utc::now()).await.ok();
                }
            }
        }
    }
}

/// Startup failures of the scheduler binary.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("DATABASE_URL must be set when STORAGE_BACKEND=sql")]
    MissingDatabaseUrl,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to run database migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open the configured event store. The SQL backend is health-checked and
/// migrated before it is returned.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn EventStore>, StartupError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory event store");
            Ok(Arc::new(MemoryEventStore::with_offset(config.tz)))
        }
        StorageBackend::Sql => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(StartupError::MissingDatabaseUrl)?;
            let store = PgEventStore::connect(url, config.tz).await?;
            tracing::info!("Database health check passed");
            calendar_db::run_migrations(store.pool()).await?;
            tracing::info!("Database migrations applied");
            Ok(Arc::new(store))
        }
    }
}
