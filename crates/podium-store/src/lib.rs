//! Podium Store — implementations of the storage contracts.
//!
//! The in-memory stores back tests and single-process runs; the PostgreSQL
//! stores provide durability across restarts. Both honour the same
//! per-stream atomic append and per-key atomic set guarantees.

pub mod memory;
pub mod pg_event_repository;
pub mod pg_job_store;
pub mod pg_key_value_store;
pub mod schema;

pub use memory::{InMemoryEventRepository, InMemoryJobStore, InMemoryKeyValueStore};
pub use pg_event_repository::PgEventRepository;
pub use pg_job_store::PgJobStore;
pub use pg_key_value_store::PgKeyValueStore;

use podium_core::error::DomainError;

/// Maps a database error into the domain taxonomy.
pub(crate) fn db_error(err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {err}"))
}
