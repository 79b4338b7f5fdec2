//! Query handlers for the matchmaking context.

use podium_core::error::DomainError;
use podium_core::repository::AggregateRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Matchmaking, MatchmakingPhase};

/// Read-only view of a matchmaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchmakingView {
    /// The matchmaking identifier.
    pub matchmaking_id: Uuid,
    /// Current phase.
    pub phase: MatchmakingPhase,
    /// Current roster.
    pub players: Vec<Uuid>,
    /// Players required to start a session.
    pub min_players: u32,
    /// Players at which it closes on its own.
    pub max_players: u32,
    /// Stream version.
    pub version: i64,
}

/// Returns the current state of a matchmaking.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if it does not exist.
pub async fn get_matchmaking_by_id(
    matchmaking_id: Uuid,
    repo: &AggregateRepository<Matchmaking>,
) -> Result<MatchmakingView, DomainError> {
    let loaded = repo.load_existing(matchmaking_id).await?;
    let state = loaded.state;
    Ok(MatchmakingView {
        matchmaking_id,
        phase: state.phase,
        players: state.players,
        min_players: state.min_players,
        max_players: state.max_players,
        version: loaded.version,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use podium_core::command::MessageContext;
    use podium_test_support::{FixedClock, NullEventBus, RecordingEventRepository};

    use super::*;

    #[tokio::test]
    async fn test_get_matchmaking_by_id_replays_history() {
        // Arrange: history produced by the aggregate itself.
        let events = Arc::new(RecordingEventRepository::new(Vec::new()));
        let writer = AggregateRepository::<Matchmaking>::new(
            events.clone(),
            Arc::new(NullEventBus),
            Arc::new(FixedClock::default()),
        );
        let id = Uuid::new_v4();
        let player = Uuid::new_v4();
        let (created, mut history) = Matchmaking::create(id, 1, 3).unwrap();
        history.extend(created.join(player).unwrap().1);
        let stored = writer
            .save(id, &history, 0, &MessageContext::new_root())
            .await
            .unwrap();
        let repo = AggregateRepository::<Matchmaking>::new(
            Arc::new(RecordingEventRepository::new(stored)),
            Arc::new(NullEventBus),
            Arc::new(FixedClock::default()),
        );

        // Act
        let view = get_matchmaking_by_id(id, &repo).await.unwrap();

        // Assert
        assert_eq!(view.phase, MatchmakingPhase::Open);
        assert_eq!(view.players, vec![player]);
        assert_eq!(view.version, 2);
        assert_eq!(events.appended().len(), 1);
    }
}
