//! Business logic services for the webhook system.

pub mod delivery_client;
pub mod emitter;
pub mod subscription_service;
