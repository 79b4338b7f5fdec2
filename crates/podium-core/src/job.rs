//! Scheduled job records and their durable store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::Command;
use crate::error::DomainError;

/// A command that can be persisted as a scheduled job.
///
/// The command itself is the job payload, so it must only carry primitive
/// identifiers and indices.
pub trait ScheduledCommand: Command + Serialize + DeserializeOwned {
    /// Job type name stored with the job.
    const JOB_TYPE: &'static str;
}

/// A job waiting to be dispatched at or after `run_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// Unique job identifier.
    pub job_id: Uuid,
    /// Job type name, mapped to a concrete command at dispatch time.
    pub job_type: String,
    /// Serialized payload: primitive identifiers only.
    pub payload: serde_json::Value,
    /// Earliest dispatch time.
    pub run_at: DateTime<Utc>,
    /// Idempotency key; at most one pending job per key.
    pub unique_key: Option<String>,
}

/// A job whose dispatch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    /// The failed job.
    pub job: ScheduledJob,
    /// Failure description.
    pub reason: String,
    /// When the failure was recorded.
    pub failed_at: DateTime<Utc>,
}

/// Outcome of inserting a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The job was stored and must be armed.
    Inserted,
    /// A pending job with the same unique key already exists.
    Duplicate,
}

/// Durable storage of pending scheduled jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Stores a pending job. The unique-key check and the insert are atomic.
    async fn insert(&self, job: &ScheduledJob) -> Result<InsertOutcome, DomainError>;

    /// Removes a fired job, releasing its unique key.
    async fn complete(&self, job_id: Uuid) -> Result<(), DomainError>;

    /// Moves a failed job to the dead-letter list, releasing its unique key.
    async fn dead_letter(
        &self,
        job_id: Uuid,
        reason: &str,
        failed_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Returns every pending job, ordered by `run_at`.
    async fn pending(&self) -> Result<Vec<ScheduledJob>, DomainError>;

    /// Returns every dead-lettered job.
    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, DomainError>;
}
