//! Key-value store abstraction for snapshots and archives.

use async_trait::async_trait;

use crate::error::DomainError;

/// Opaque blob storage with per-key atomic get/set.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the blob stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DomainError>;

    /// Stores `value` under `key`, replacing any previous blob.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), DomainError>;

    /// Stores `value` under `key` only if the key is free. Returns `true`
    /// when this call wrote the blob.
    async fn set_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, DomainError>;
}
