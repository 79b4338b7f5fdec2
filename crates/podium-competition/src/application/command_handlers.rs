//! Command handlers for the competition context.
//!
//! Each handler loads the engine, asks it for a decision and saves the
//! resulting events with the version it loaded. Commands that arrive from
//! the scheduler after the competition has moved on are benign no-ops.

use std::sync::Arc;

use async_trait::async_trait;
use podium_core::command::{CommandEnvelope, CommandHandler};
use podium_core::error::DomainError;
use tracing::{debug, info, instrument};

use crate::application::store::CompetitionStore;
use crate::domain::commands::{
    CreateCompetition, EndRound, RegisterResult, SimulateAttempt, StartNextRound,
};
use crate::domain::engine::{EnginePhase, GameCompetition};
use crate::domain::scoring::HillScorer;
use crate::domain::simulator::{JumpContext, JumpSimulator};

/// Handles every competition command.
#[derive(Clone)]
pub struct CompetitionCommandHandler {
    store: CompetitionStore,
    simulator: Arc<dyn JumpSimulator>,
}

impl CompetitionCommandHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(store: CompetitionStore, simulator: Arc<dyn JumpSimulator>) -> Self {
        Self { store, simulator }
    }
}

#[async_trait]
impl CommandHandler<CreateCompetition> for CompetitionCommandHandler {
    #[instrument(skip_all, fields(competition_id = %envelope.command.competition_id))]
    async fn handle(&self, envelope: CommandEnvelope<CreateCompetition>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        if self.store.load(command.competition_id).await?.is_some() {
            debug!("competition already exists");
            return Ok(());
        }
        let decision = GameCompetition::create(
            command.competition_id,
            command.config,
            command.competitors,
            command.seed,
        )?;
        self.store
            .save(command.competition_id, 0, decision, &context)
            .await?;
        info!("competition created");
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<RegisterResult> for CompetitionCommandHandler {
    #[instrument(skip_all, fields(competition_id = %envelope.command.competition_id))]
    async fn handle(&self, envelope: CommandEnvelope<RegisterResult>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.store.load_existing(command.competition_id).await?;
        let scorer = HillScorer::new(loaded.state.config().hill);
        let decision = loaded
            .state
            .register_result(command.competitor_id, command.attempt, &scorer)?;
        self.store
            .save(command.competition_id, loaded.version, decision, &context)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<SimulateAttempt> for CompetitionCommandHandler {
    #[instrument(skip_all, fields(
        competition_id = %envelope.command.competition_id,
        round_index = envelope.command.round_index,
        competitor_id = %envelope.command.competitor_id
    ))]
    async fn handle(&self, envelope: CommandEnvelope<SimulateAttempt>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.store.load_existing(command.competition_id).await?;
        let engine = &loaded.state;
        let running_round = engine.phase()
            == EnginePhase::Running {
                round_index: command.round_index,
            };
        let pending = engine
            .generate_startlist()
            .is_ok_and(|startlist| startlist.is_pending(command.competitor_id));
        if !running_round || !pending {
            debug!(phase = %engine.phase(), "attempt no longer pending");
            return Ok(());
        }

        let competitor = engine.competitor(command.competitor_id).ok_or_else(|| {
            DomainError::NotFound(format!("competitor {}", command.competitor_id))
        })?;
        let attempt = self.simulator.simulate(&JumpContext {
            competition_id: command.competition_id,
            round_index: command.round_index,
            competitor,
            hill: engine.config().hill,
        });
        let scorer = HillScorer::new(engine.config().hill);
        let decision = engine.register_result(command.competitor_id, attempt, &scorer)?;
        self.store
            .save(command.competition_id, loaded.version, decision, &context)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<EndRound> for CompetitionCommandHandler {
    #[instrument(skip_all, fields(
        competition_id = %envelope.command.competition_id,
        round_index = envelope.command.round_index
    ))]
    async fn handle(&self, envelope: CommandEnvelope<EndRound>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.store.load_existing(command.competition_id).await?;
        let expected = EnginePhase::Running {
            round_index: command.round_index,
        };
        if loaded.state.phase() != expected {
            debug!(phase = %loaded.state.phase(), "round already closed");
            return Ok(());
        }
        let decision = loaded.state.end_round(&loaded.state.config().next_round)?;
        let phase = decision.0.phase();
        self.store
            .save(command.competition_id, loaded.version, decision, &context)
            .await?;
        info!(%phase, "round ended");
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<StartNextRound> for CompetitionCommandHandler {
    #[instrument(skip_all, fields(
        competition_id = %envelope.command.competition_id,
        round_index = envelope.command.round_index
    ))]
    async fn handle(&self, envelope: CommandEnvelope<StartNextRound>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.store.load_existing(command.competition_id).await?;
        let expected = EnginePhase::WaitingForNextRound {
            next_round_index: command.round_index,
        };
        if loaded.state.phase() != expected {
            debug!(phase = %loaded.state.phase(), "round already started");
            return Ok(());
        }
        let decision = loaded.state.start_next_round()?;
        self.store
            .save(command.competition_id, loaded.version, decision, &context)
            .await?;
        info!("next round started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use podium_core::aggregate::AggregateRoot;
    use podium_core::command::MessageContext;
    use podium_core::kv::KeyValueStore;
    use podium_core::repository::{AggregateRepository, EventRepository};
    use podium_store::{InMemoryEventRepository, InMemoryKeyValueStore};
    use podium_test_support::{FixedClock, RecordingEventBus};
    use uuid::Uuid;

    use super::*;
    use crate::application::store::snapshot_key;
    use crate::domain::config::{
        CompetitionConfig, Competitor, NextRoundPolicy, RoundConfig, RoundParticipantsLimit,
        TieBreakPolicy,
    };
    use crate::domain::scoring::{Attempt, HillProfile};
    use crate::domain::simulator::SeededJumpSimulator;

    struct Fixture {
        handler: CompetitionCommandHandler,
        store: CompetitionStore,
        events: Arc<InMemoryEventRepository>,
        snapshots: Arc<InMemoryKeyValueStore>,
        bus: Arc<RecordingEventBus>,
    }

    fn fixture() -> Fixture {
        let events = Arc::new(InMemoryEventRepository::new());
        let snapshots = Arc::new(InMemoryKeyValueStore::new());
        let bus = Arc::new(RecordingEventBus::default());
        let repo = AggregateRepository::new(
            events.clone(),
            bus.clone(),
            Arc::new(FixedClock::default()),
        );
        let store = CompetitionStore::new(repo, snapshots.clone());
        Fixture {
            handler: CompetitionCommandHandler::new(
                store.clone(),
                Arc::new(SeededJumpSimulator::default()),
            ),
            store,
            events,
            snapshots,
            bus,
        }
    }

    fn entries() -> Vec<Competitor> {
        (1..=3)
            .map(|bib| Competitor {
                id: Uuid::from_u128(u128::from(bib)),
                bib,
            })
            .collect()
    }

    fn two_round_config() -> CompetitionConfig {
        CompetitionConfig {
            rounds: vec![
                RoundConfig {
                    limit: RoundParticipantsLimit::Exact(2),
                },
                RoundConfig {
                    limit: RoundParticipantsLimit::None,
                },
            ],
            tie_break: TieBreakPolicy::LowestBib,
            next_round: NextRoundPolicy::AlwaysWait,
            hill: HillProfile::LARGE_HILL,
        }
    }

    async fn create(fx: &Fixture, competition_id: Uuid) {
        fx.handler
            .handle(CommandEnvelope::root(CreateCompetition {
                competition_id,
                config: two_round_config(),
                competitors: entries(),
                seed: 42,
            }))
            .await
            .unwrap();
    }

    async fn simulate(fx: &Fixture, competition_id: Uuid, round_index: usize, bib: u128) {
        fx.handler
            .handle(CommandEnvelope::root(SimulateAttempt {
                competition_id,
                round_index,
                competitor_id: Uuid::from_u128(bib),
            }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        // Arrange
        let fx = fixture();
        let competition_id = Uuid::new_v4();

        // Act
        create(&fx, competition_id).await;
        create(&fx, competition_id).await;

        // Assert
        let stream = fx
            .events
            .load_events(GameCompetition::AGGREGATE_TYPE, competition_id)
            .await
            .unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(fx.bus.published_types(), vec!["competition.started"]);
    }

    #[tokio::test]
    async fn test_simulate_attempt_registers_result_and_refreshes_snapshot() {
        let fx = fixture();
        let competition_id = Uuid::new_v4();
        create(&fx, competition_id).await;

        simulate(&fx, competition_id, 0, 1).await;

        let blob = fx
            .snapshots
            .get(&snapshot_key(competition_id))
            .await
            .unwrap()
            .unwrap();
        let snapshot = GameCompetition::load_snapshot(&blob).unwrap();
        assert_eq!(snapshot.version(), 2);
        assert_eq!(snapshot.rounds()[0].results.len(), 1);
        assert_eq!(
            fx.bus.published_types().last().map(String::as_str),
            Some("competition.result_registered")
        );
    }

    #[tokio::test]
    async fn test_simulate_attempt_for_finished_competitor_is_noop() {
        let fx = fixture();
        let competition_id = Uuid::new_v4();
        create(&fx, competition_id).await;
        simulate(&fx, competition_id, 0, 1).await;

        simulate(&fx, competition_id, 0, 1).await;
        simulate(&fx, competition_id, 3, 2).await;

        let loaded = fx.store.load_existing(competition_id).await.unwrap();
        assert_eq!(loaded.version, 2);
    }

    #[tokio::test]
    async fn test_end_round_with_pending_attempts_is_policy_violation() {
        let fx = fixture();
        let competition_id = Uuid::new_v4();
        create(&fx, competition_id).await;
        simulate(&fx, competition_id, 0, 1).await;

        let result = fx
            .handler
            .handle(CommandEnvelope::root(EndRound {
                competition_id,
                round_index: 0,
            }))
            .await;

        assert!(matches!(result, Err(DomainError::PolicyViolation(_))));
    }

    #[tokio::test]
    async fn test_round_flow_waits_and_mismatched_commands_are_noops() {
        let fx = fixture();
        let competition_id = Uuid::new_v4();
        create(&fx, competition_id).await;
        for bib in 1..=3 {
            simulate(&fx, competition_id, 0, bib).await;
        }
        let end = |round_index| {
            CommandEnvelope::root(EndRound {
                competition_id,
                round_index,
            })
        };

        fx.handler.handle(end(0)).await.unwrap();
        fx.handler.handle(end(0)).await.unwrap();
        fx.handler
            .handle(CommandEnvelope::root(StartNextRound {
                competition_id,
                round_index: 1,
            }))
            .await
            .unwrap();
        fx.handler
            .handle(CommandEnvelope::root(StartNextRound {
                competition_id,
                round_index: 1,
            }))
            .await
            .unwrap();

        let loaded = fx.store.load_existing(competition_id).await.unwrap();
        assert_eq!(loaded.state.phase(), EnginePhase::Running { round_index: 1 });
        assert_eq!(loaded.state.generate_startlist().unwrap().entries().len(), 2);
        assert_eq!(loaded.version, 6);
    }

    #[tokio::test]
    async fn test_register_result_rejects_second_attempt() {
        let fx = fixture();
        let competition_id = Uuid::new_v4();
        create(&fx, competition_id).await;
        let register = || {
            CommandEnvelope::root(RegisterResult {
                competition_id,
                competitor_id: Uuid::from_u128(2),
                attempt: Attempt::new(121.5, vec![18.0, 18.5, 18.0, 17.5, 18.0]),
            })
        };

        fx.handler.handle(register()).await.unwrap();
        let second = fx.handler.handle(register()).await;

        assert!(matches!(second, Err(DomainError::PolicyViolation(_))));
    }

    #[tokio::test]
    async fn test_load_folds_events_newer_than_snapshot() {
        // Arrange: a snapshot taken after creation, then an event appended
        // without refreshing it.
        let fx = fixture();
        let competition_id = Uuid::new_v4();
        create(&fx, competition_id).await;
        let loaded = fx.store.load_existing(competition_id).await.unwrap();
        let (_, events) = loaded
            .state
            .register_result(
                Uuid::from_u128(3),
                Attempt::new(118.0, vec![]),
                &HillScorer::new(HillProfile::LARGE_HILL),
            )
            .unwrap();
        let repo = AggregateRepository::<GameCompetition>::new(
            fx.events.clone(),
            fx.bus.clone(),
            Arc::new(FixedClock::default()),
        );
        repo.save(competition_id, &events, 1, &MessageContext::new_root())
            .await
            .unwrap();

        // Act
        let restored = fx.store.load_existing(competition_id).await.unwrap();

        // Assert
        let replayed = repo.load_existing(competition_id).await.unwrap();
        assert_eq!(restored.version, 2);
        assert_eq!(restored.state, replayed.state);
    }

    #[tokio::test]
    async fn test_snapshot_ahead_of_stream_is_ignored() {
        let fx = fixture();
        let competition_id = Uuid::new_v4();
        create(&fx, competition_id).await;
        simulate(&fx, competition_id, 0, 1).await;
        let ahead = fx
            .snapshots
            .get(&snapshot_key(competition_id))
            .await
            .unwrap()
            .unwrap();
        let other_id = Uuid::new_v4();
        create(&fx, other_id).await;
        fx.snapshots
            .set(&snapshot_key(other_id), ahead)
            .await
            .unwrap();

        let loaded = fx.store.load_existing(other_id).await.unwrap();

        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.state.competition_id(), other_id);
        assert!(loaded.state.generate_results().is_empty());
    }
}
