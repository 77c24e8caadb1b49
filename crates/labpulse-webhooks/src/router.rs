//! Axum router setup for webhook endpoints.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::handlers::{deliveries, subscriptions};
use crate::services::subscription_service::SubscriptionService;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhooksState {
    pub subscription_service: Arc<SubscriptionService>,
    pool: PgPool,
}

impl WebhooksState {
    /// Create a new webhooks state.
    pub fn new(pool: PgPool, allow_http: bool) -> Self {
        Self {
            subscription_service: Arc::new(
                SubscriptionService::new(pool.clone()).with_allow_http(allow_http),
            ),
            pool,
        }
    }

    /// Get a reference to the database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Creates the webhook router with all routes.
pub fn webhooks_router(state: WebhooksState) -> Router {
    Router::new()
        // Subscription registry
        .route(
            "/projects/:project_id/webhooks",
            post(subscriptions::create_subscription_handler)
                .get(subscriptions::list_subscriptions_handler),
        )
        .route(
            "/projects/:project_id/webhooks/:id",
            axum::routing::delete(subscriptions::delete_subscription_handler),
        )
        // Delivery visibility and manual retry
        .route(
            "/projects/:project_id/webhook-deliveries",
            get(deliveries::list_deliveries_handler),
        )
        .route(
            "/projects/:project_id/webhook-deliveries/:id/retry",
            post(deliveries::retry_delivery_handler),
        )
        .with_state(state)
}
