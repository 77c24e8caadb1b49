//! Periodic maintenance sweeps over the delivery outbox.
//!
//! `ReclaimSweeper` returns deliveries stranded in in_progress (a worker
//! crashed mid-attempt) to pending. `RetentionPurger` deletes succeeded
//! rows past their retention window. Dead-lettered rows are never purged
//! automatically.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use labpulse_db::models::WebhookDelivery;

/// Returns stuck in_progress deliveries to pending.
pub struct ReclaimSweeper {
    pool: PgPool,
    /// How long a row may stay locked before it counts as stuck.
    stuck_after: Duration,
    /// Sweep cadence.
    interval: Duration,
}

impl ReclaimSweeper {
    /// Create a new sweeper.
    pub fn new(pool: PgPool, stuck_after: Duration, interval: Duration) -> Self {
        Self {
            pool,
            stuck_after,
            interval,
        }
    }

    /// Run the sweep loop until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            target: "webhook_delivery",
            stuck_after_secs = self.stuck_after.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Reclaim sweeper started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }

            let cutoff = Utc::now()
                - chrono::Duration::from_std(self.stuck_after)
                    .unwrap_or_else(|_| chrono::Duration::seconds(300));

            match WebhookDelivery::reclaim_stuck(&self.pool, cutoff).await {
                Ok(0) => {}
                Ok(count) => {
                    warn!(
                        target: "webhook_delivery",
                        count,
                        "Reclaimed stuck webhook deliveries"
                    );
                }
                Err(e) => {
                    error!(target: "webhook_delivery", error = %e, "Reclaim sweep failed");
                }
            }
        }

        info!(target: "webhook_delivery", "Reclaim sweeper stopped");
    }
}

/// Deletes succeeded deliveries past the retention window.
pub struct RetentionPurger {
    pool: PgPool,
    /// How long succeeded rows are kept.
    retention: Duration,
    /// Purge cadence.
    interval: Duration,
}

impl RetentionPurger {
    /// Create a new purger.
    pub fn new(pool: PgPool, retention: Duration, interval: Duration) -> Self {
        Self {
            pool,
            retention,
            interval,
        }
    }

    /// Run the purge loop until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            target: "webhook_delivery",
            retention_secs = self.retention.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Retention purger started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }

            let cutoff = Utc::now()
                - chrono::Duration::from_std(self.retention)
                    .unwrap_or_else(|_| chrono::Duration::days(7));

            match WebhookDelivery::delete_old_succeeded(&self.pool, cutoff).await {
                Ok(0) => {}
                Ok(count) => {
                    info!(
                        target: "webhook_delivery",
                        count,
                        "Purged old succeeded webhook deliveries"
                    );
                }
                Err(e) => {
                    error!(target: "webhook_delivery", error = %e, "Retention purge failed");
                }
            }
        }

        info!(target: "webhook_delivery", "Retention purger stopped");
    }
}
