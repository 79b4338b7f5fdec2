//! Database schema for the PostgreSQL stores.
//!
//! The authoritative DDL lives in the workspace `migrations/` directory and
//! is embedded at compile time.

use podium_core::error::DomainError;
use sqlx::PgPool;
use tracing::info;

/// Applies all pending migrations.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("migration failed: {e}")))?;
    info!("database migrations applied");
    Ok(())
}
