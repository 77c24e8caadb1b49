//! labpulse API server.
//!
//! Composition root: loads config, connects to Postgres, runs migrations,
//! mounts the webhook admin routes, and runs the delivery engine alongside
//! the HTTP server until shutdown.

mod config;
mod openapi;

use axum::{routing::get, Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use labpulse_webhooks::{webhooks_router, DeliveryEngine, WebhooksState};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = labpulse_db::create_pool(&config.database_url).await?;
    labpulse_db::run_migrations(&pool).await?;

    let state = WebhooksState::new(pool.clone(), config.webhook_allow_http);
    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(openapi::openapi_routes())
        .nest("/api/v1", webhooks_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    let engine = DeliveryEngine::start(pool, config.engine.clone())?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "labpulse API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining delivery engine");
    engine.stop().await;

    Ok(())
}

/// Liveness probe.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Resolve on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
