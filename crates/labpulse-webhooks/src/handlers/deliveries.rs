//! Delivery visibility and manual retry handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use labpulse_db::models::{DeliveryStatus, WebhookDelivery};

use crate::error::{ApiResult, WebhookError};
use crate::models::{DeliveryListResponse, DeliveryResponse, ListDeliveriesQuery};
use crate::router::WebhooksState;

/// List deliveries for a project, newest first.
#[utoipa::path(
    get,
    path = "/projects/{project_id}/webhook-deliveries",
    tag = "Webhooks",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ListDeliveriesQuery,
    ),
    responses(
        (status = 200, description = "Paginated delivery list", body = DeliveryListResponse),
        (status = 400, description = "Unknown status filter"),
    )
)]
pub async fn list_deliveries_handler(
    State(state): State<WebhooksState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListDeliveriesQuery>,
) -> ApiResult<Json<DeliveryListResponse>> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(DeliveryStatus::parse(raw).ok_or_else(|| {
            WebhookError::Validation(format!("Unknown delivery status: {raw}"))
        })?),
        None => None,
    };

    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let deliveries =
        WebhookDelivery::list_by_project(state.pool(), project_id, status, limit, offset).await?;
    let total = WebhookDelivery::count_by_project(state.pool(), project_id, status).await?;

    Ok(Json(DeliveryListResponse {
        items: deliveries.into_iter().map(Into::into).collect(),
        total,
        limit,
        offset,
    }))
}

/// Requeue a delivery for immediate dispatch.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/webhook-deliveries/{id}/retry",
    tag = "Webhooks",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("id" = Uuid, Path, description = "Delivery ID"),
    ),
    responses(
        (status = 200, description = "Delivery requeued", body = DeliveryResponse),
        (status = 404, description = "Delivery not found"),
    )
)]
pub async fn retry_delivery_handler(
    State(state): State<WebhooksState>,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DeliveryResponse>> {
    let delivery = WebhookDelivery::retry(state.pool(), project_id, id)
        .await?
        .ok_or(WebhookError::DeliveryNotFound)?;

    Ok(Json(delivery.into()))
}
