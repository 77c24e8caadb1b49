//! Event emitter: fans out a domain event to the delivery outbox.
//!
//! Emitting is enqueue-only. No network I/O happens here, and subscriber
//! problems (bad endpoints, downtime) never fail the caller; the dispatcher
//! deals with them asynchronously.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use labpulse_db::models::{EnqueueDelivery, WebhookDelivery, WebhookSubscription};

use crate::error::WebhookError;
use crate::models::EventEnvelope;

/// Enqueues one delivery per matching active subscription.
#[derive(Clone)]
pub struct EventEmitter {
    pool: PgPool,
}

impl EventEmitter {
    /// Create a new emitter.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Emit an event to all active subscriptions in the project that match
    /// the event type.
    ///
    /// Target URL and secret are snapshotted per subscription at enqueue
    /// time. When `dedup_key` is given, each enqueue derives a
    /// per-subscription key (`<dedup_key>:<subscription_id>`) so re-emitting
    /// the same event is idempotent.
    ///
    /// Returns the enqueued (or, under dedup, pre-existing) deliveries.
    pub async fn emit(
        &self,
        project_id: Uuid,
        event_type: &str,
        payload: serde_json::Value,
        dedup_key: Option<&str>,
    ) -> Result<Vec<WebhookDelivery>, WebhookError> {
        let subscriptions =
            WebhookSubscription::list_active_matching(&self.pool, project_id, event_type).await?;

        if subscriptions.is_empty() {
            debug!(
                target: "webhook_delivery",
                project_id = %project_id,
                event_type,
                "No active subscriptions match event, nothing enqueued"
            );
            return Ok(Vec::new());
        }

        let envelope = EventEnvelope {
            event_type: event_type.to_string(),
            project_id,
            occurred_at: Utc::now(),
            payload,
        };
        let request_body = serde_json::to_value(&envelope)
            .map_err(|e| WebhookError::Internal(format!("Failed to serialize envelope: {e}")))?;

        let mut deliveries = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let delivery = WebhookDelivery::enqueue(
                &self.pool,
                EnqueueDelivery {
                    subscription_id: subscription.id,
                    project_id,
                    event_type: event_type.to_string(),
                    target_url: subscription.target_url.clone(),
                    secret: subscription.secret.clone(),
                    request_body: request_body.clone(),
                    dedup_key: dedup_key.map(|key| format!("{key}:{}", subscription.id)),
                },
            )
            .await?;
            deliveries.push(delivery);
        }

        info!(
            target: "webhook_delivery",
            project_id = %project_id,
            event_type,
            count = deliveries.len(),
            "Enqueued webhook deliveries"
        );

        Ok(deliveries)
    }
}
