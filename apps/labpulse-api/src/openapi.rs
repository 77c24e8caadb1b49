//! `OpenAPI` documentation for the webhook admin API.
//!
//! Aggregates the utoipa path annotations from labpulse-webhooks into a
//! single spec served at `/api-docs/openapi.json`.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

/// `OpenAPI` documentation for the labpulse API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "labpulse API",
        version = "0.1.0",
        description = "Webhook subscription management and delivery tracking"
    ),
    tags(
        (name = "Webhooks", description = "Webhook subscription management and delivery tracking")
    ),
    paths(
        labpulse_webhooks::handlers::subscriptions::create_subscription_handler,
        labpulse_webhooks::handlers::subscriptions::list_subscriptions_handler,
        labpulse_webhooks::handlers::subscriptions::delete_subscription_handler,
        labpulse_webhooks::handlers::deliveries::list_deliveries_handler,
        labpulse_webhooks::handlers::deliveries::retry_delivery_handler,
    ),
    components(schemas(
        labpulse_webhooks::models::CreateSubscriptionRequest,
        labpulse_webhooks::models::SubscriptionResponse,
        labpulse_webhooks::models::SubscriptionListResponse,
        labpulse_webhooks::models::DeliveryResponse,
        labpulse_webhooks::models::DeliveryListResponse,
        labpulse_webhooks::error::ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Routes serving the generated spec.
pub fn openapi_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
