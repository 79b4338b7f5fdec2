//! Write-once archive of per-stage competition results.

use std::sync::Arc;

use podium_competition::domain::results::ClassificationResult;
use podium_core::error::DomainError;
use podium_core::kv::KeyValueStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Archived results of one competition stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResults {
    /// Owning session.
    pub session_id: Uuid,
    /// Stage ordinal within the session.
    pub stage_ordinal: u32,
    /// The competition that ran the stage.
    pub competition_id: Uuid,
    /// Final classification.
    pub results: Vec<ClassificationResult>,
}

/// Key of a stage's archived results.
#[must_use]
pub fn archive_key(session_id: Uuid, stage_ordinal: u32) -> String {
    format!("session:{session_id}:stage:{stage_ordinal}:results")
}

/// Immutable per-stage result snapshots keyed by session and stage ordinal.
#[derive(Clone)]
pub struct GameCompetitionResultsArchive {
    store: Arc<dyn KeyValueStore>,
}

impl GameCompetitionResultsArchive {
    /// Creates an archive over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stores a stage's results once. Writing identical results again is
    /// accepted so a re-delivered completion stays harmless.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PolicyViolation` when different results are
    /// already archived for the stage, and `DomainError::Infrastructure` on
    /// storage or encoding failures.
    pub async fn store(&self, entry: &StageResults) -> Result<(), DomainError> {
        let key = archive_key(entry.session_id, entry.stage_ordinal);
        if let Some(existing) = self.fetch(&key).await? {
            if existing == *entry {
                debug!(%key, "stage results already archived");
                return Ok(());
            }
            return Err(DomainError::PolicyViolation(format!(
                "stage {} of session {} is already archived with different results",
                entry.stage_ordinal, entry.session_id
            )));
        }
        let bytes = serde_json::to_vec(entry)
            .map_err(|e| DomainError::Infrastructure(format!("archive encoding failed: {e}")))?;
        self.store.set(&key, bytes).await?;
        info!(%key, classified = entry.results.len(), "stage results archived");
        Ok(())
    }

    /// Loads a stage's results, if archived.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on storage or decoding failures.
    pub async fn load(
        &self,
        session_id: Uuid,
        stage_ordinal: u32,
    ) -> Result<Option<StageResults>, DomainError> {
        self.fetch(&archive_key(session_id, stage_ordinal)).await
    }

    /// Loads a stage's results, failing when they are missing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` when the stage is not archived.
    pub async fn load_existing(
        &self,
        session_id: Uuid,
        stage_ordinal: u32,
    ) -> Result<StageResults, DomainError> {
        self.load(session_id, stage_ordinal).await?.ok_or_else(|| {
            DomainError::NotFound(format!(
                "archived results of stage {stage_ordinal} in session {session_id}"
            ))
        })
    }

    async fn fetch(&self, key: &str) -> Result<Option<StageResults>, DomainError> {
        let Some(bytes) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| DomainError::Infrastructure(format!("archive decoding failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use podium_competition::domain::scoring::Points;
    use podium_store::InMemoryKeyValueStore;

    use super::*;

    fn entry(total: i64) -> StageResults {
        StageResults {
            session_id: Uuid::nil(),
            stage_ordinal: 2,
            competition_id: Uuid::nil(),
            results: vec![ClassificationResult {
                rank: 1,
                competitor_id: Uuid::nil(),
                bib: 1,
                rounds: Vec::new(),
                total: Points::from_tenths(total),
            }],
        }
    }

    #[tokio::test]
    async fn test_store_then_load_returns_entry() {
        let archive = GameCompetitionResultsArchive::new(Arc::new(InMemoryKeyValueStore::new()));

        archive.store(&entry(1200)).await.unwrap();

        let loaded = archive.load(Uuid::nil(), 2).await.unwrap();
        assert_eq!(loaded, Some(entry(1200)));
        assert_eq!(archive.load(Uuid::nil(), 3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_identical_rewrite_is_accepted() {
        let archive = GameCompetitionResultsArchive::new(Arc::new(InMemoryKeyValueStore::new()));
        archive.store(&entry(1200)).await.unwrap();

        let result = archive.store(&entry(1200)).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_differing_rewrite_is_policy_violation() {
        // Arrange
        let archive = GameCompetitionResultsArchive::new(Arc::new(InMemoryKeyValueStore::new()));
        archive.store(&entry(1200)).await.unwrap();

        // Act
        let result = archive.store(&entry(900)).await;

        // Assert
        assert!(matches!(result, Err(DomainError::PolicyViolation(_))));
        assert_eq!(archive.load(Uuid::nil(), 2).await.unwrap(), Some(entry(1200)));
    }

    #[tokio::test]
    async fn test_load_existing_missing_is_not_found() {
        let archive = GameCompetitionResultsArchive::new(Arc::new(InMemoryKeyValueStore::new()));

        let result = archive.load_existing(Uuid::nil(), 0).await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }
}
