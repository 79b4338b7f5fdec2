//! Competition flow saga: simulates each pending jump, closes rounds,
//! starts waiting rounds and hands final results back to the session.

use std::sync::Arc;

use async_trait::async_trait;
use podium_competition::domain::commands::{EndRound, SimulateAttempt, StartNextRound};
use podium_competition::domain::engine::GameCompetition;
use podium_competition::domain::events::CompetitionEvent;
use podium_core::bus::EventHandler;
use podium_core::command::{CommandEnvelope, MessageContext};
use podium_core::error::DomainError;
use podium_core::repository::StoredEvent;
use podium_messaging::CommandBus;
use podium_scheduler::Scheduler;
use podium_session::domain::commands::CompleteCompetitionStage;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::schedule_caused_by;
use crate::lookup::{OwnerLookup, OwnerLookupResult};
use crate::timings::SagaTimings;

/// Reacts to competition events.
pub struct CompetitionFlowSaga {
    scheduler: Scheduler,
    commands: Arc<CommandBus>,
    sessions: Arc<dyn OwnerLookup>,
    timings: SagaTimings,
}

impl CompetitionFlowSaga {
    /// Creates the saga. `sessions` maps competitions to their session.
    #[must_use]
    pub fn new(
        scheduler: Scheduler,
        commands: Arc<CommandBus>,
        sessions: Arc<dyn OwnerLookup>,
        timings: SagaTimings,
    ) -> Self {
        Self {
            scheduler,
            commands,
            sessions,
            timings,
        }
    }

    async fn simulate(
        &self,
        event: &StoredEvent,
        competition_id: Uuid,
        round_index: usize,
        competitor_id: Uuid,
    ) -> Result<(), DomainError> {
        schedule_caused_by(
            &self.scheduler,
            event,
            SimulateAttempt {
                competition_id,
                round_index,
                competitor_id,
            },
            self.timings.jump_interval,
            format!("competition:{competition_id}:round:{round_index}:participant:{competitor_id}"),
        )
        .await
    }
}

#[async_trait]
impl EventHandler for CompetitionFlowSaga {
    fn name(&self) -> &'static str {
        "competition_flow_saga"
    }

    #[instrument(skip_all, fields(
        saga = "competition_flow",
        competition_id = %event.aggregate_id,
        event_type = %event.event_type,
        correlation_id = %event.correlation_id
    ))]
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let Some(payload) = event.decode::<GameCompetition>()? else {
            return Ok(());
        };
        let competition_id = event.aggregate_id;
        match payload {
            CompetitionEvent::CompetitionStarted(started) => match started.startlist.first() {
                Some(&first) => self.simulate(event, competition_id, 0, first).await,
                None => Ok(()),
            },
            CompetitionEvent::NextRoundStarted(started) => match started.startlist.first() {
                Some(&first) => {
                    self.simulate(event, competition_id, started.round_index, first)
                        .await
                }
                None => Ok(()),
            },
            CompetitionEvent::ResultRegistered(registered) => {
                if let Some(next) = registered.next_pending {
                    self.simulate(event, competition_id, registered.round_index, next)
                        .await?;
                }
                if registered.round_complete {
                    schedule_caused_by(
                        &self.scheduler,
                        event,
                        EndRound {
                            competition_id,
                            round_index: registered.round_index,
                        },
                        self.timings.round_end_delay,
                        format!(
                            "competition:{competition_id}:round:{}:end",
                            registered.round_index
                        ),
                    )
                    .await?;
                }
                Ok(())
            }
            CompetitionEvent::RoundEnded(ended) => match ended.waiting_for {
                Some(round_index) => {
                    schedule_caused_by(
                        &self.scheduler,
                        event,
                        StartNextRound {
                            competition_id,
                            round_index,
                        },
                        self.timings.round_break,
                        format!("competition:{competition_id}:round:{round_index}:start"),
                    )
                    .await
                }
                None => Ok(()),
            },
            CompetitionEvent::CompetitionEnded(ended) => {
                match self.sessions.try_get_owner(competition_id).await? {
                    OwnerLookupResult::Found(session_id) => {
                        self.commands
                            .dispatch(CommandEnvelope::new(
                                CompleteCompetitionStage {
                                    session_id,
                                    competition_id,
                                    results: ended.results,
                                },
                                MessageContext::caused_by(event),
                            ))
                            .await
                    }
                    OwnerLookupResult::NotFound => {
                        debug!("competition has no owning session");
                        Ok(())
                    }
                }
            }
        }
    }
}
