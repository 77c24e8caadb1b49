//! CRUD handlers for webhook subscriptions.
//!
//! Project scoping comes from the path; authentication and project
//! authorization are applied by outer middleware before requests reach
//! these handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{
    CreateSubscriptionRequest, ListSubscriptionsQuery, SubscriptionListResponse,
    SubscriptionResponse,
};
use crate::router::WebhooksState;

/// Create a new webhook subscription.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/webhooks",
    tag = "Webhooks",
    params(
        ("project_id" = Uuid, Path, description = "Project ID")
    ),
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid URL or event types"),
    )
)]
pub async fn create_subscription_handler(
    State(state): State<WebhooksState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> ApiResult<(StatusCode, Json<SubscriptionResponse>)> {
    let response = state
        .subscription_service
        .create_subscription(project_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// List webhook subscriptions for a project.
#[utoipa::path(
    get,
    path = "/projects/{project_id}/webhooks",
    tag = "Webhooks",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ListSubscriptionsQuery,
    ),
    responses(
        (status = 200, description = "Paginated subscription list", body = SubscriptionListResponse),
    )
)]
pub async fn list_subscriptions_handler(
    State(state): State<WebhooksState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> ApiResult<Json<SubscriptionListResponse>> {
    let response = state
        .subscription_service
        .list_subscriptions(project_id, query)
        .await?;

    Ok(Json(response))
}

/// Delete a webhook subscription.
#[utoipa::path(
    delete,
    path = "/projects/{project_id}/webhooks/{id}",
    tag = "Webhooks",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("id" = Uuid, Path, description = "Subscription ID"),
    ),
    responses(
        (status = 204, description = "Subscription deleted"),
        (status = 404, description = "Subscription not found"),
    )
)]
pub async fn delete_subscription_handler(
    State(state): State<WebhooksState>,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .subscription_service
        .delete_subscription(project_id, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
