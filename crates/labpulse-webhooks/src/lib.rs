//! Webhook delivery engine for project event notifications.
//!
//! Provides project-scoped subscription management, a transactional outbox
//! with at-least-once delivery, HMAC-SHA256 payload signing, exponential
//! backoff retries, dead-lettering, and reclaim/retention sweeps.

pub mod crypto;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod sweeper;
pub mod validation;

pub use engine::{DeliveryEngine, EngineConfig};
pub use error::WebhookError;
pub use models::EventEnvelope;
pub use router::{webhooks_router, WebhooksState};
pub use services::emitter::EventEmitter;
