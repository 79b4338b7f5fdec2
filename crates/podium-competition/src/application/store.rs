//! Snapshot-aware persistence of the competition engine.
//!
//! The event stream is the source of truth. After every save the engine is
//! also written to the key-value store; loading starts from that snapshot
//! and folds only the events appended after it. A missing, unreadable or
//! stale snapshot falls back to a full replay.

use std::sync::Arc;

use podium_core::aggregate::AggregateRoot;
use podium_core::command::MessageContext;
use podium_core::error::DomainError;
use podium_core::kv::KeyValueStore;
use podium_core::repository::{AggregateRepository, Loaded, StoredEvent};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::engine::{Decision, GameCompetition};

/// Key under which the latest engine snapshot is stored.
#[must_use]
pub fn snapshot_key(competition_id: Uuid) -> String {
    format!("competition:{competition_id}:snapshot")
}

/// Loads and saves competitions.
#[derive(Clone)]
pub struct CompetitionStore {
    repo: AggregateRepository<GameCompetition>,
    snapshots: Arc<dyn KeyValueStore>,
}

impl CompetitionStore {
    /// Creates a store over the aggregate repository and snapshot storage.
    #[must_use]
    pub fn new(repo: AggregateRepository<GameCompetition>, snapshots: Arc<dyn KeyValueStore>) -> Self {
        Self { repo, snapshots }
    }

    /// Rebuilds a competition from its snapshot and newer events.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the stream cannot be loaded or folded.
    pub async fn load(&self, competition_id: Uuid) -> Result<Option<Loaded<GameCompetition>>, DomainError> {
        let history = self.repo.load_history(competition_id).await?;
        #[allow(clippy::cast_possible_wrap)]
        let version = history.len() as i64;

        let base = match self.read_snapshot(competition_id).await {
            Some(engine) if engine.version() <= version => Some(engine),
            Some(engine) => {
                warn!(
                    %competition_id,
                    snapshot_version = engine.version(),
                    stream_version = version,
                    "snapshot is ahead of the stream; replaying from scratch"
                );
                None
            }
            None => None,
        };
        let skip = base
            .as_ref()
            .map_or(0, |engine| usize::try_from(engine.version()).unwrap_or(usize::MAX));

        let state = history
            .iter()
            .skip(skip)
            .try_fold(base, |state, event| {
                GameCompetition::evolve(state, &event.payload).map(Some)
            })?;
        Ok(state.map(|state| Loaded { state, version }))
    }

    /// Like [`Self::load`] but a missing competition is an error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if no events exist.
    pub async fn load_existing(&self, competition_id: Uuid) -> Result<Loaded<GameCompetition>, DomainError> {
        self.load(competition_id)
            .await?
            .ok_or(DomainError::AggregateNotFound(competition_id))
    }

    /// Appends the decided events with `expected_version`, then refreshes the
    /// snapshot. A snapshot write failure is logged only.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` or store errors from the
    /// append.
    pub async fn save(
        &self,
        competition_id: Uuid,
        expected_version: i64,
        decision: Decision,
        context: &MessageContext,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let (engine, events) = decision;
        let stored = self
            .repo
            .save(competition_id, &events, expected_version, context)
            .await?;
        if stored.is_empty() {
            return Ok(stored);
        }
        match engine.to_snapshot() {
            Ok(bytes) => {
                if let Err(e) = self.snapshots.set(&snapshot_key(competition_id), bytes).await {
                    warn!(%competition_id, error = %e, "failed to write competition snapshot");
                }
            }
            Err(e) => warn!(%competition_id, error = %e, "failed to encode competition snapshot"),
        }
        Ok(stored)
    }

    async fn read_snapshot(&self, competition_id: Uuid) -> Option<GameCompetition> {
        let bytes = match self.snapshots.get(&snapshot_key(competition_id)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(%competition_id, error = %e, "failed to read competition snapshot");
                return None;
            }
        };
        match GameCompetition::load_snapshot(&bytes) {
            Ok(engine) => {
                debug!(%competition_id, version = engine.version(), "restored engine snapshot");
                Some(engine)
            }
            Err(e) => {
                warn!(%competition_id, error = %e, "discarding unreadable competition snapshot");
                None
            }
        }
    }
}
