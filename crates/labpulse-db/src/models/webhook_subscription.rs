//! `WebhookSubscription` model: the per-project subscriber registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A project-scoped webhook subscription.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WebhookSubscription {
    /// Primary key.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Subscriber endpoint URL.
    pub target_url: String,
    /// Optional signing secret. When set, deliveries carry an HMAC signature.
    pub secret: Option<String>,
    /// Event types this subscription receives.
    pub event_types: Vec<String>,
    /// Inactive subscriptions are skipped at emit time.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a new subscription.
#[derive(Debug, Clone)]
pub struct CreateWebhookSubscription {
    pub project_id: Uuid,
    pub target_url: String,
    pub secret: Option<String>,
    pub event_types: Vec<String>,
}

impl WebhookSubscription {
    /// Insert a new subscription.
    pub async fn create(
        pool: &sqlx::PgPool,
        data: CreateWebhookSubscription,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO webhook_subscriptions (project_id, target_url, secret, event_types)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(data.project_id)
        .bind(&data.target_url)
        .bind(&data.secret)
        .bind(&data.event_types)
        .fetch_one(pool)
        .await
    }

    /// Find a subscription by id within a project.
    pub async fn find_by_id(
        pool: &sqlx::PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM webhook_subscriptions
            WHERE project_id = $1 AND id = $2
            ",
        )
        .bind(project_id)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// List subscriptions for a project, oldest first.
    pub async fn list_by_project(
        pool: &sqlx::PgPool,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM webhook_subscriptions
            WHERE project_id = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Count subscriptions for a project.
    pub async fn count_by_project(
        pool: &sqlx::PgPool,
        project_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let result: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*) FROM webhook_subscriptions
            WHERE project_id = $1
            ",
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok(result.0)
    }

    /// Delete a subscription. Returns the number of rows removed.
    pub async fn delete(
        pool: &sqlx::PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r"
            DELETE FROM webhook_subscriptions
            WHERE project_id = $1 AND id = $2
            ",
        )
        .bind(project_id)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// List active subscriptions in a project that receive the given event
    /// type, oldest first.
    pub async fn list_active_matching(
        pool: &sqlx::PgPool,
        project_id: Uuid,
        event_type: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM webhook_subscriptions
            WHERE project_id = $1
              AND is_active = TRUE
              AND $2 = ANY(event_types)
            ORDER BY created_at ASC
            ",
        )
        .bind(project_id)
        .bind(event_type)
        .fetch_all(pool)
        .await
    }
}
