//! Request/response DTOs and the outbound event envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use labpulse_db::models::{WebhookDelivery, WebhookSubscription};

// ---------------------------------------------------------------------------
// Event envelope
// ---------------------------------------------------------------------------

/// The JSON document delivered to subscriber endpoints.
///
/// Serialized compactly with sorted keys, so the bytes a subscriber signs
/// against are deterministic for a given envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_type: String,
    pub project_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Subscription DTOs
// ---------------------------------------------------------------------------

/// Request body for creating a subscription.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    /// Subscriber endpoint URL (HTTPS).
    pub target_url: String,
    /// Event types to receive. Normalized server-side.
    pub event_types: Vec<String>,
    /// Optional signing secret.
    pub secret: Option<String>,
}

/// A subscription as returned by the API. The secret is never echoed back.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub target_url: String,
    pub event_types: Vec<String>,
    pub is_active: bool,
    pub has_secret: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookSubscription> for SubscriptionResponse {
    fn from(s: WebhookSubscription) -> Self {
        Self {
            id: s.id,
            project_id: s.project_id,
            target_url: s.target_url,
            event_types: s.event_types,
            is_active: s.is_active,
            has_secret: s.secret.is_some(),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Paginated subscription list.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionListResponse {
    pub items: Vec<SubscriptionResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query parameters for listing subscriptions.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSubscriptionsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Delivery DTOs
// ---------------------------------------------------------------------------

/// A delivery as returned by the API. Secrets are never exposed.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub project_id: Uuid,
    pub event_type: String,
    pub target_url: String,
    pub status: String,
    pub attempt_count: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookDelivery> for DeliveryResponse {
    fn from(d: WebhookDelivery) -> Self {
        Self {
            id: d.id,
            subscription_id: d.subscription_id,
            project_id: d.project_id,
            event_type: d.event_type,
            target_url: d.target_url,
            status: d.status.as_str().to_string(),
            attempt_count: d.attempt_count,
            last_error: d.last_error,
            next_attempt_at: d.next_attempt_at,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

/// Paginated delivery list.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryListResponse {
    pub items: Vec<DeliveryResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query parameters for listing deliveries.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDeliveriesQuery {
    /// Filter by status (pending, in_progress, succeeded, dead_lettered).
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}
