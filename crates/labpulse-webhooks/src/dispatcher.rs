//! Background dispatcher: claims due deliveries and sends them.
//!
//! The loop claims a batch of due pending rows (atomic, SKIP LOCKED), groups
//! them by target endpoint, sends with bounded concurrency, and records each
//! outcome. Retries use capped exponential backoff; once the attempt budget
//! is spent a failing delivery is dead-lettered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use labpulse_db::models::{AttemptDisposition, WebhookDelivery};

use crate::services::delivery_client::{DeliveryClient, DeliveryOutcome};

/// Dispatcher tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sleep between polls when no rows are due.
    pub poll_interval: Duration,
    /// Maximum rows claimed per batch.
    pub batch_size: i64,
    /// Attempts before a failing delivery is dead-lettered.
    pub max_attempts: i32,
    /// Ceiling on the retry backoff delay, in seconds.
    pub backoff_cap_secs: u64,
    /// Maximum concurrent sends within a batch.
    pub max_in_flight: usize,
    /// Send rows for the same endpoint one at a time.
    pub per_target_serial: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            batch_size: 100,
            max_attempts: 5,
            backoff_cap_secs: 60,
            max_in_flight: 16,
            per_target_serial: true,
        }
    }
}

/// Background worker that drains the delivery outbox.
pub struct Dispatcher {
    pool: PgPool,
    client: DeliveryClient,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a new dispatcher.
    pub fn new(pool: PgPool, client: DeliveryClient, config: DispatcherConfig) -> Self {
        Self {
            pool,
            client,
            config,
        }
    }

    /// Run the dispatch loop until cancelled.
    ///
    /// An in-flight batch is always marked before the loop exits, so
    /// shutdown does not strand rows in in_progress.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            target: "webhook_delivery",
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            max_attempts = self.config.max_attempts,
            "Webhook dispatcher started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match WebhookDelivery::claim_due_pending(&self.pool, self.config.batch_size).await {
                Ok(batch) if !batch.is_empty() => {
                    self.process_batch(batch).await;
                    // More rows may be due; poll again immediately.
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(target: "webhook_delivery", error = %e, "Failed to claim deliveries");
                }
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(target: "webhook_delivery", "Webhook dispatcher stopped");
    }

    /// Send a claimed batch and record every outcome.
    async fn process_batch(&self, batch: Vec<WebhookDelivery>) {
        let groups = if self.config.per_target_serial {
            group_by_target(batch)
        } else {
            batch.into_iter().map(|d| vec![d]).collect()
        };

        futures::stream::iter(groups)
            .for_each_concurrent(self.config.max_in_flight, |group| async move {
                for delivery in group {
                    self.process_one(delivery).await;
                }
            })
            .await;
    }

    /// Send one delivery and mark the attempt.
    async fn process_one(&self, delivery: WebhookDelivery) {
        let outcome = self.client.send(&delivery).await;
        let disposition = decide_disposition(
            &outcome,
            delivery.attempt_count,
            self.config.max_attempts,
            self.config.backoff_cap_secs,
            Utc::now(),
        );

        match &outcome {
            DeliveryOutcome::Success { status } => {
                info!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    status,
                    attempt = delivery.attempt_count,
                    "Webhook delivered"
                );
            }
            DeliveryOutcome::Failure { error } => {
                let dead = matches!(&disposition, AttemptDisposition::DeadLetter { .. });
                warn!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    attempt = delivery.attempt_count,
                    dead_lettered = dead,
                    error = %error,
                    "Webhook delivery attempt failed"
                );
            }
        }

        match WebhookDelivery::mark_attempt(&self.pool, delivery.id, disposition).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                // The reclaim sweep took the row back mid-flight. It is
                // pending again and will be re-sent; at-least-once holds.
                warn!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    "Delivery was reclaimed while in flight, outcome dropped"
                );
            }
            Err(e) => {
                error!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    error = %e,
                    "Failed to record delivery attempt"
                );
            }
        }
    }
}

/// Group deliveries by target URL, preserving claim order within a group.
fn group_by_target(batch: Vec<WebhookDelivery>) -> Vec<Vec<WebhookDelivery>> {
    let mut order = Vec::new();
    let mut groups: HashMap<String, Vec<WebhookDelivery>> = HashMap::new();

    for delivery in batch {
        let key = delivery.target_url.clone();
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(delivery);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .collect()
}

/// Retry delay for a failed attempt: `min(cap, 2^min(attempt, 6))` seconds.
///
/// `attempt` is the 1-based count of attempts already started, so the first
/// retry waits 2s, then 4s, 8s, ... up to the cap.
#[must_use]
pub fn backoff_delay(attempt: i32, cap_secs: u64) -> Duration {
    let exponent = attempt.clamp(0, 6) as u32;
    Duration::from_secs(cap_secs.min(2u64.pow(exponent)))
}

/// Decide what to do with a delivery after an attempt.
fn decide_disposition(
    outcome: &DeliveryOutcome,
    attempt_count: i32,
    max_attempts: i32,
    backoff_cap_secs: u64,
    now: DateTime<Utc>,
) -> AttemptDisposition {
    match outcome {
        DeliveryOutcome::Success { .. } => AttemptDisposition::Succeeded,
        DeliveryOutcome::Failure { error } => {
            if attempt_count >= max_attempts {
                AttemptDisposition::DeadLetter {
                    error: error.clone(),
                }
            } else {
                let delay = backoff_delay(attempt_count, backoff_cap_secs);
                AttemptDisposition::Retry {
                    next_attempt_at: now
                        + chrono::Duration::from_std(delay)
                            .unwrap_or_else(|_| chrono::Duration::seconds(backoff_cap_secs as i64)),
                    error: error.clone(),
                }
            }
        }
    }
}
