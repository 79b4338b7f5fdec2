//! `PostgreSQL` implementation of the `KeyValueStore` trait.

use async_trait::async_trait;
use sqlx::PgPool;

use podium_core::error::DomainError;
use podium_core::kv::KeyValueStore;

use crate::db_error;

/// PostgreSQL-backed blob store.
#[derive(Debug, Clone)]
pub struct PgKeyValueStore {
    pool: PgPool,
}

impl PgKeyValueStore {
    /// Creates a new `PgKeyValueStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for PgKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DomainError> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT value FROM kv_blobs WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(&e))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO kv_blobs (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            INSERT INTO kv_blobs (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO NOTHING
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;
        Ok(result.rows_affected() == 1)
    }
}
