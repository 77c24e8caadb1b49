//! Persisted models.

pub mod webhook_delivery;
pub mod webhook_subscription;

pub use webhook_delivery::{
    AttemptDisposition, DeliveryStatus, EnqueueDelivery, WebhookDelivery,
};
pub use webhook_subscription::{CreateWebhookSubscription, WebhookSubscription};
