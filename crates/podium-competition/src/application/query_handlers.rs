//! Query handlers for the competition context.

use podium_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use crate::application::store::CompetitionStore;
use crate::domain::engine::EnginePhase;
use crate::domain::results::{ClassificationResult, StartlistEntry};

/// Read-only view of a competition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitionView {
    /// The competition identifier.
    pub competition_id: Uuid,
    /// Stream version the view reflects.
    pub version: i64,
    /// Engine phase.
    pub phase: EnginePhase,
    /// Startlist of the round in progress, if any.
    pub startlist: Option<Vec<StartlistEntry>>,
    /// Current classification.
    pub results: Vec<ClassificationResult>,
}

/// Returns the current state and classification of a competition.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the competition does not
/// exist, or load errors.
pub async fn get_competition_results(
    competition_id: Uuid,
    store: &CompetitionStore,
) -> Result<CompetitionView, DomainError> {
    let loaded = store.load_existing(competition_id).await?;
    let engine = loaded.state;
    Ok(CompetitionView {
        competition_id,
        version: loaded.version,
        phase: engine.phase(),
        startlist: engine
            .generate_startlist()
            .ok()
            .map(|startlist| startlist.entries().to_vec()),
        results: engine.generate_results(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use podium_core::command::MessageContext;
    use podium_core::repository::AggregateRepository;
    use podium_store::{InMemoryEventRepository, InMemoryKeyValueStore};
    use podium_test_support::{FixedClock, NullEventBus};

    use super::*;
    use crate::domain::config::{CompetitionConfig, Competitor};
    use crate::domain::engine::GameCompetition;
    use crate::domain::scoring::{Attempt, HillScorer};

    fn store() -> CompetitionStore {
        let repo = AggregateRepository::new(
            Arc::new(InMemoryEventRepository::new()),
            Arc::new(NullEventBus),
            Arc::new(FixedClock::default()),
        );
        CompetitionStore::new(repo, Arc::new(InMemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn test_get_competition_results_returns_view() {
        // Arrange
        let store = store();
        let competition_id = Uuid::new_v4();
        let jumper = Competitor {
            id: Uuid::new_v4(),
            bib: 1,
        };
        let config = CompetitionConfig::single_round();
        let scorer = HillScorer::new(config.hill);
        let created = GameCompetition::create(competition_id, config, vec![jumper], 3).unwrap();
        let ctx = MessageContext::new_root();
        let scored = created
            .0
            .register_result(jumper.id, Attempt::new(125.0, vec![]), &scorer)
            .unwrap();
        store.save(competition_id, 0, created, &ctx).await.unwrap();
        store.save(competition_id, 1, scored, &ctx).await.unwrap();

        // Act
        let view = get_competition_results(competition_id, &store).await.unwrap();

        // Assert
        assert_eq!(view.version, 2);
        assert_eq!(view.phase, EnginePhase::Running { round_index: 0 });
        assert_eq!(view.results.len(), 1);
        assert_eq!(view.results[0].rank, 1);
        assert!(view.startlist.is_some_and(|entries| entries[0].done));
    }

    #[tokio::test]
    async fn test_get_competition_results_unknown_id_is_not_found() {
        let result = get_competition_results(Uuid::new_v4(), &store()).await;

        assert!(matches!(result, Err(DomainError::AggregateNotFound(_))));
    }
}
