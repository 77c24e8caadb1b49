//! Error types for the labpulse-db crate.

use thiserror::Error;

/// Database operation errors.
///
/// Model queries return `sqlx::Error` directly; this type covers the crate's
/// own entry points, pool creation and migrations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),
}
