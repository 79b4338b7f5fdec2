//! Game session saga: paces the stage graph and creates the competition or
//! draft behind each started stage.

use std::sync::Arc;

use async_trait::async_trait;
use podium_competition::domain::commands::CreateCompetition;
use podium_core::bus::EventHandler;
use podium_core::command::{CommandEnvelope, MessageContext};
use podium_core::error::DomainError;
use podium_core::repository::StoredEvent;
use podium_draft::domain::commands::CreateDraft;
use podium_messaging::CommandBus;
use podium_scheduler::Scheduler;
use podium_session::domain::aggregates::GameSession;
use podium_session::domain::commands::{EndGameSession, StartNextStage};
use podium_session::domain::events::GameSessionEvent;
use podium_session::domain::phases::NextStage;
use tracing::{info, instrument};
use uuid::Uuid;

use super::schedule_caused_by;
use crate::lookup::OwnerLookup;
use crate::timings::SagaTimings;

/// Reacts to session events.
pub struct GameSessionSaga {
    scheduler: Scheduler,
    commands: Arc<CommandBus>,
    competitions: Arc<dyn OwnerLookup>,
    drafts: Arc<dyn OwnerLookup>,
    timings: SagaTimings,
}

impl GameSessionSaga {
    /// Creates the saga. `competitions` and `drafts` map children to the
    /// session that started them.
    #[must_use]
    pub fn new(
        scheduler: Scheduler,
        commands: Arc<CommandBus>,
        competitions: Arc<dyn OwnerLookup>,
        drafts: Arc<dyn OwnerLookup>,
        timings: SagaTimings,
    ) -> Self {
        Self {
            scheduler,
            commands,
            competitions,
            drafts,
            timings,
        }
    }

    /// Schedules the end of a break: the next stage, or settlement.
    async fn schedule_next(
        &self,
        event: &StoredEvent,
        session_id: Uuid,
        next: NextStage,
        delay: std::time::Duration,
    ) -> Result<(), DomainError> {
        let key = format!("session:{session_id}:{}", next.tag());
        if next == NextStage::Ended {
            schedule_caused_by(
                &self.scheduler,
                event,
                EndGameSession { session_id },
                self.timings.end_session_delay,
                key,
            )
            .await
        } else {
            schedule_caused_by(
                &self.scheduler,
                event,
                StartNextStage {
                    session_id,
                    stage: next,
                },
                delay,
                key,
            )
            .await
        }
    }
}

#[async_trait]
impl EventHandler for GameSessionSaga {
    fn name(&self) -> &'static str {
        "game_session_saga"
    }

    #[instrument(skip_all, fields(
        saga = "game_session",
        session_id = %event.aggregate_id,
        event_type = %event.event_type,
        correlation_id = %event.correlation_id
    ))]
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let Some(payload) = event.decode::<GameSession>()? else {
            return Ok(());
        };
        let session_id = event.aggregate_id;
        match payload {
            GameSessionEvent::GameSessionCreated(created) => {
                self.schedule_next(
                    event,
                    session_id,
                    created.first_stage,
                    self.timings.session_start_delay,
                )
                .await
            }
            GameSessionEvent::CompetitionStageStarted(started) => {
                self.competitions
                    .add_mapping(started.competition_id, session_id)
                    .await?;
                self.commands
                    .dispatch(CommandEnvelope::new(
                        CreateCompetition {
                            competition_id: started.competition_id,
                            config: started.config,
                            competitors: started.competitors,
                            seed: started.seed,
                        },
                        MessageContext::caused_by(event),
                    ))
                    .await
            }
            GameSessionEvent::DraftStageStarted(started) => {
                self.drafts.add_mapping(started.draft_id, session_id).await?;
                self.commands
                    .dispatch(CommandEnvelope::new(
                        CreateDraft {
                            draft_id: started.draft_id,
                            players: started.players,
                            candidates: started.candidates,
                            picks_per_player: started.picks_per_player,
                            seed: started.seed,
                        },
                        MessageContext::caused_by(event),
                    ))
                    .await
            }
            GameSessionEvent::CompetitionStageCompleted(completed) => {
                self.schedule_next(event, session_id, completed.next, self.timings.stage_break)
                    .await
            }
            GameSessionEvent::DraftCompleted(completed) => {
                self.schedule_next(event, session_id, completed.next, self.timings.stage_break)
                    .await
            }
            GameSessionEvent::GameSessionEnded(ended) => {
                info!(standings = ended.ranking.len(), "session settled");
                Ok(())
            }
        }
    }
}
