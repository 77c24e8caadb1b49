//! Database layer for the labpulse webhook delivery engine.
//!
//! Provides the connection pool, embedded migrations, and the persisted
//! models: the subscription registry and the delivery outbox.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::create_pool;
