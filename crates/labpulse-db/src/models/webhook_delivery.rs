//! `WebhookDelivery` model: the transactional outbox for webhook sends.
//!
//! Rows move through a closed state machine:
//! pending -> in_progress -> succeeded | pending (retry) | dead_lettered.
//! The dispatcher claims due pending rows with `FOR UPDATE SKIP LOCKED`,
//! so concurrent workers never hold the same row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Maximum stored length of a delivery error message, in characters.
const MAX_ERROR_CHARS: usize = 2000;

/// Delivery lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "webhook_delivery_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    InProgress,
    Succeeded,
    DeadLettered,
}

impl DeliveryStatus {
    /// Parse from the wire form ("pending", "in_progress", ...).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "succeeded" => Some(Self::Succeeded),
            "dead_lettered" => Some(Self::DeadLettered),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Succeeded => "succeeded",
            Self::DeadLettered => "dead_lettered",
        }
    }
}

/// An outbox row: one pending or completed send of one event to one
/// subscriber endpoint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookDelivery {
    /// Primary key, also sent as `X-Webhook-Delivery-Id`.
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub project_id: Uuid,
    pub event_type: String,
    /// Endpoint URL snapshotted at enqueue time.
    pub target_url: String,
    /// Signing secret snapshotted at enqueue time.
    pub secret: Option<String>,
    /// Full event envelope; immutable after enqueue.
    pub request_body: serde_json::Value,
    /// Optional idempotence key. Unique across the table when present.
    pub dedup_key: Option<String>,
    pub status: DeliveryStatus,
    /// Number of attempts started so far. Incremented at claim time.
    pub attempt_count: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    /// Set while a worker holds the row; null otherwise.
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to enqueue a new delivery.
#[derive(Debug, Clone)]
pub struct EnqueueDelivery {
    pub subscription_id: Uuid,
    pub project_id: Uuid,
    pub event_type: String,
    pub target_url: String,
    pub secret: Option<String>,
    pub request_body: serde_json::Value,
    pub dedup_key: Option<String>,
}

/// Outcome of one delivery attempt, as recorded by `mark_attempt`.
#[derive(Debug, Clone)]
pub enum AttemptDisposition {
    /// Endpoint returned 2xx.
    Succeeded,
    /// Attempt failed; try again at the given time.
    Retry {
        next_attempt_at: DateTime<Utc>,
        error: String,
    },
    /// Attempt failed and the attempt budget is exhausted.
    DeadLetter { error: String },
}

/// Truncate an error message to the stored limit.
fn truncate_error(error: &str) -> String {
    error.chars().take(MAX_ERROR_CHARS).collect()
}

impl WebhookDelivery {
    /// Enqueue a delivery as pending, due immediately.
    ///
    /// When a dedup key is given, insert uses ON CONFLICT DO NOTHING; if a
    /// row with the same key already exists the existing row is returned
    /// and no new row is created.
    pub async fn enqueue(
        pool: &sqlx::PgPool,
        data: EnqueueDelivery,
    ) -> Result<Self, sqlx::Error> {
        if let Some(dedup_key) = &data.dedup_key {
            let inserted: Option<Self> = sqlx::query_as(
                r"
                INSERT INTO webhook_deliveries
                    (subscription_id, project_id, event_type, target_url, secret,
                     request_body, dedup_key)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (dedup_key) WHERE dedup_key IS NOT NULL DO NOTHING
                RETURNING *
                ",
            )
            .bind(data.subscription_id)
            .bind(data.project_id)
            .bind(&data.event_type)
            .bind(&data.target_url)
            .bind(&data.secret)
            .bind(&data.request_body)
            .bind(dedup_key)
            .fetch_optional(pool)
            .await?;

            if let Some(row) = inserted {
                return Ok(row);
            }

            // Conflict: another enqueue with the same key won the race.
            sqlx::query_as(
                r"
                SELECT * FROM webhook_deliveries
                WHERE dedup_key = $1
                ",
            )
            .bind(dedup_key)
            .fetch_one(pool)
            .await
        } else {
            sqlx::query_as(
                r"
                INSERT INTO webhook_deliveries
                    (subscription_id, project_id, event_type, target_url, secret,
                     request_body)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                ",
            )
            .bind(data.subscription_id)
            .bind(data.project_id)
            .bind(&data.event_type)
            .bind(&data.target_url)
            .bind(&data.secret)
            .bind(&data.request_body)
            .fetch_one(pool)
            .await
        }
    }

    /// Atomically claim up to `limit` due pending deliveries.
    ///
    /// Claimed rows become in_progress with `locked_at` set and
    /// `attempt_count` incremented; the returned rows carry the
    /// post-increment count. `FOR UPDATE SKIP LOCKED` ensures two workers
    /// never claim the same row.
    pub async fn claim_due_pending(
        pool: &sqlx::PgPool,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            UPDATE webhook_deliveries
            SET status = 'in_progress',
                locked_at = now(),
                attempt_count = attempt_count + 1,
                updated_at = now()
            WHERE id IN (
                SELECT id FROM webhook_deliveries
                WHERE status = 'pending' AND next_attempt_at <= now()
                ORDER BY next_attempt_at ASC, created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            ",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Record the outcome of an attempt on an in_progress row.
    ///
    /// Returns `None` if the row is no longer in_progress (for example, a
    /// reclaim sweep took it back while the request was in flight); the
    /// row is left untouched in that case.
    pub async fn mark_attempt(
        pool: &sqlx::PgPool,
        id: Uuid,
        disposition: AttemptDisposition,
    ) -> Result<Option<Self>, sqlx::Error> {
        match disposition {
            AttemptDisposition::Succeeded => {
                sqlx::query_as(
                    r"
                    UPDATE webhook_deliveries
                    SET status = 'succeeded',
                        locked_at = NULL,
                        last_error = NULL,
                        updated_at = now()
                    WHERE id = $1 AND status = 'in_progress'
                    RETURNING *
                    ",
                )
                .bind(id)
                .fetch_optional(pool)
                .await
            }
            AttemptDisposition::Retry {
                next_attempt_at,
                error,
            } => {
                sqlx::query_as(
                    r"
                    UPDATE webhook_deliveries
                    SET status = 'pending',
                        locked_at = NULL,
                        last_error = $2,
                        next_attempt_at = $3,
                        updated_at = now()
                    WHERE id = $1 AND status = 'in_progress'
                    RETURNING *
                    ",
                )
                .bind(id)
                .bind(truncate_error(&error))
                .bind(next_attempt_at)
                .fetch_optional(pool)
                .await
            }
            AttemptDisposition::DeadLetter { error } => {
                sqlx::query_as(
                    r"
                    UPDATE webhook_deliveries
                    SET status = 'dead_lettered',
                        locked_at = NULL,
                        last_error = $2,
                        updated_at = now()
                    WHERE id = $1 AND status = 'in_progress'
                    RETURNING *
                    ",
                )
                .bind(id)
                .bind(truncate_error(&error))
                .fetch_optional(pool)
                .await
            }
        }
    }

    /// Return in_progress rows locked before the cutoff to pending, due
    /// immediately. `attempt_count` is left as-is; the lost attempt still
    /// counts toward the budget. Returns the number of rows reclaimed.
    pub async fn reclaim_stuck(
        pool: &sqlx::PgPool,
        locked_before: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE webhook_deliveries
            SET status = 'pending',
                locked_at = NULL,
                next_attempt_at = now(),
                updated_at = now()
            WHERE status = 'in_progress' AND locked_at < $1
            ",
        )
        .bind(locked_before)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete succeeded deliveries created before the cutoff. Dead-lettered
    /// rows are never purged here. Returns the number of rows removed.
    pub async fn delete_old_succeeded(
        pool: &sqlx::PgPool,
        created_before: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r"
            DELETE FROM webhook_deliveries
            WHERE status = 'succeeded' AND created_at < $1
            ",
        )
        .bind(created_before)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Force a delivery back to pending, due immediately.
    ///
    /// Used for manual retry of dead-lettered rows. Refuses rows a worker
    /// currently holds (in_progress). Returns `None` when no matching row
    /// exists in the project.
    pub async fn retry(
        pool: &sqlx::PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            UPDATE webhook_deliveries
            SET status = 'pending',
                locked_at = NULL,
                last_error = NULL,
                next_attempt_at = now(),
                updated_at = now()
            WHERE project_id = $1 AND id = $2 AND status <> 'in_progress'
            RETURNING *
            ",
        )
        .bind(project_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// List deliveries for a project, newest first, optionally filtered by
    /// status.
    pub async fn list_by_project(
        pool: &sqlx::PgPool,
        project_id: Uuid,
        status: Option<DeliveryStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM webhook_deliveries
            WHERE project_id = $1
              AND ($2::webhook_delivery_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(project_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Count deliveries for a project, optionally filtered by status.
    pub async fn count_by_project(
        pool: &sqlx::PgPool,
        project_id: Uuid,
        status: Option<DeliveryStatus>,
    ) -> Result<i64, sqlx::Error> {
        let result: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*) FROM webhook_deliveries
            WHERE project_id = $1
              AND ($2::webhook_delivery_status IS NULL OR status = $2)
            ",
        )
        .bind(project_id)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok(result.0)
    }
}
