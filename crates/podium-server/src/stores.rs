//! Store selection: PostgreSQL when a database is configured, memory
//! otherwise.

use std::sync::Arc;

use podium_orchestration::RuntimeStores;
use podium_store::schema::migrate;
use podium_store::{
    InMemoryEventRepository, InMemoryJobStore, InMemoryKeyValueStore, PgEventRepository,
    PgJobStore, PgKeyValueStore,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;

/// Opens the stores `config` asks for, migrating the database first.
///
/// # Errors
///
/// Returns `AppError::Database` if the pool cannot connect, and
/// `AppError::Domain` if migrations fail.
pub async fn open(config: &ServerConfig) -> Result<RuntimeStores, AppError> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set, state is kept in memory only");
        return Ok(in_memory());
    };
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(url)
        .await?;
    migrate(&pool).await?;
    info!(max_connections = config.db_max_connections, "postgres stores ready");
    Ok(RuntimeStores {
        events: Arc::new(PgEventRepository::new(pool.clone())),
        kv: Arc::new(PgKeyValueStore::new(pool.clone())),
        jobs: Arc::new(PgJobStore::new(pool)),
    })
}

/// Stores that live as long as the process.
#[must_use]
pub fn in_memory() -> RuntimeStores {
    RuntimeStores {
        events: Arc::new(InMemoryEventRepository::new()),
        kv: Arc::new(InMemoryKeyValueStore::new()),
        jobs: Arc::new(InMemoryJobStore::new()),
    }
}
