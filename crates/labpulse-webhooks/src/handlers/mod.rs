//! HTTP handlers for the webhook admin surface.

pub mod deliveries;
pub mod subscriptions;
