//! Subscription management service.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use labpulse_db::models::{CreateWebhookSubscription, WebhookSubscription};

use crate::error::WebhookError;
use crate::models::{
    CreateSubscriptionRequest, ListSubscriptionsQuery, SubscriptionListResponse,
    SubscriptionResponse,
};
use crate::validation::{normalize_event_types, validate_webhook_url};

/// Service for managing project webhook subscriptions.
#[derive(Clone)]
pub struct SubscriptionService {
    pool: PgPool,
    allow_http: bool,
}

impl SubscriptionService {
    /// Create a new subscription service.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            allow_http: false,
        }
    }

    /// Permit plain HTTP target URLs (dev/test only).
    #[must_use]
    pub fn with_allow_http(mut self, allow_http: bool) -> Self {
        self.allow_http = allow_http;
        self
    }

    /// Create a subscription after validating the target URL and
    /// normalizing the event type list.
    pub async fn create_subscription(
        &self,
        project_id: Uuid,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionResponse, WebhookError> {
        validate_webhook_url(&request.target_url, self.allow_http)?;
        let event_types = normalize_event_types(&request.event_types)?;

        let subscription = WebhookSubscription::create(
            &self.pool,
            CreateWebhookSubscription {
                project_id,
                target_url: request.target_url,
                secret: request.secret,
                event_types,
            },
        )
        .await?;

        info!(
            target: "webhook_subscriptions",
            subscription_id = %subscription.id,
            project_id = %project_id,
            "Webhook subscription created"
        );

        Ok(subscription.into())
    }

    /// List subscriptions for a project with pagination.
    pub async fn list_subscriptions(
        &self,
        project_id: Uuid,
        query: ListSubscriptionsQuery,
    ) -> Result<SubscriptionListResponse, WebhookError> {
        let limit = query.limit.clamp(1, 100);
        let offset = query.offset.max(0);

        let subscriptions =
            WebhookSubscription::list_by_project(&self.pool, project_id, limit, offset).await?;
        let total = WebhookSubscription::count_by_project(&self.pool, project_id).await?;

        Ok(SubscriptionListResponse {
            items: subscriptions.into_iter().map(Into::into).collect(),
            total,
            limit,
            offset,
        })
    }

    /// Delete a subscription.
    pub async fn delete_subscription(
        &self,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<(), WebhookError> {
        let deleted = WebhookSubscription::delete(&self.pool, project_id, id).await?;
        if deleted == 0 {
            return Err(WebhookError::SubscriptionNotFound);
        }

        info!(
            target: "webhook_subscriptions",
            subscription_id = %id,
            project_id = %project_id,
            "Webhook subscription deleted"
        );

        Ok(())
    }
}
