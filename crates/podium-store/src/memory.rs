//! In-memory stores.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use podium_core::error::DomainError;
use podium_core::job::{DeadLetter, InsertOutcome, JobStore, ScheduledJob};
use podium_core::kv::KeyValueStore;
use podium_core::repository::{EventRepository, StoredEvent};
use uuid::Uuid;

fn poisoned<T>(err: &std::sync::PoisonError<T>) -> DomainError {
    DomainError::Infrastructure(format!("store mutex poisoned: {err}"))
}

/// Event store keeping every stream in a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: Mutex<HashMap<(String, Uuid), Vec<StoredEvent>>>,
}

impl InMemoryEventRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let streams = self.streams.lock().map_err(|e| poisoned(&e))?;
        Ok(streams
            .get(&(aggregate_type.to_owned(), aggregate_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut streams = self.streams.lock().map_err(|e| poisoned(&e))?;
        let stream = streams
            .entry((aggregate_type.to_owned(), aggregate_id))
            .or_default();
        #[allow(clippy::cast_possible_wrap)]
        let actual = stream.len() as i64;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        Ok(())
    }
}

/// Key-value store keeping blobs in a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DomainError> {
        let entries = self.entries.lock().map_err(|e| poisoned(&e))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), DomainError> {
        let mut entries = self.entries.lock().map_err(|e| poisoned(&e))?;
        entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>) -> Result<bool, DomainError> {
        let mut entries = self.entries.lock().map_err(|e| poisoned(&e))?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_owned(), value);
        Ok(true)
    }
}

#[derive(Debug, Default)]
struct JobTable {
    pending: HashMap<Uuid, ScheduledJob>,
    keys: HashMap<String, Uuid>,
    dead: Vec<DeadLetter>,
}

impl JobTable {
    fn take(&mut self, job_id: Uuid) -> Option<ScheduledJob> {
        let job = self.pending.remove(&job_id)?;
        if let Some(key) = &job.unique_key {
            self.keys.remove(key);
        }
        Some(job)
    }
}

/// Job store keeping pending jobs in a process-local table.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    table: Mutex<JobTable>,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: &ScheduledJob) -> Result<InsertOutcome, DomainError> {
        let mut table = self.table.lock().map_err(|e| poisoned(&e))?;
        if let Some(key) = &job.unique_key {
            if table.keys.contains_key(key) {
                return Ok(InsertOutcome::Duplicate);
            }
            table.keys.insert(key.clone(), job.job_id);
        }
        table.pending.insert(job.job_id, job.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn complete(&self, job_id: Uuid) -> Result<(), DomainError> {
        let mut table = self.table.lock().map_err(|e| poisoned(&e))?;
        table.take(job_id);
        Ok(())
    }

    async fn dead_letter(
        &self,
        job_id: Uuid,
        reason: &str,
        failed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut table = self.table.lock().map_err(|e| poisoned(&e))?;
        if let Some(job) = table.take(job_id) {
            table.dead.push(DeadLetter {
                job,
                reason: reason.to_owned(),
                failed_at,
            });
        }
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<ScheduledJob>, DomainError> {
        let table = self.table.lock().map_err(|e| poisoned(&e))?;
        let mut jobs: Vec<ScheduledJob> = table.pending.values().cloned().collect();
        jobs.sort_by_key(|job| (job.run_at, job.job_id));
        Ok(jobs)
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, DomainError> {
        let table = self.table.lock().map_err(|e| poisoned(&e))?;
        Ok(table.dead.clone())
    }
}
