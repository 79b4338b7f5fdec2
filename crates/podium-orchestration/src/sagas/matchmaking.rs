//! Matchmaking saga: closes matchmakings on timeout and turns a full
//! roster into a game session.

use std::sync::Arc;

use async_trait::async_trait;
use podium_core::bus::EventHandler;
use podium_core::command::{CommandEnvelope, MessageContext};
use podium_core::error::DomainError;
use podium_core::repository::StoredEvent;
use podium_matchmaking::domain::aggregates::Matchmaking;
use podium_matchmaking::domain::commands::EndMatchmaking;
use podium_matchmaking::domain::events::MatchmakingEvent;
use podium_messaging::CommandBus;
use podium_scheduler::Scheduler;
use podium_session::application::notifier::SessionNotifier;
use podium_session::application::roster::CompetitorRoster;
use podium_session::domain::commands::CreateGameSession;
use podium_session::domain::settings::GameSessionSettings;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::schedule_caused_by;
use crate::lookup::OwnerLookup;
use crate::timings::SagaTimings;

const SESSION_NAMESPACE: Uuid = Uuid::from_u128(0x6f3c_2a1e_9b4d_4c7a_8e15_d2b0_7a64_c391);

/// The session a matchmaking turns into. Every delivery of the same
/// `MatchmakingEnded` derives the same id.
#[must_use]
pub fn session_id_for(matchmaking_id: Uuid) -> Uuid {
    Uuid::new_v5(&SESSION_NAMESPACE, matchmaking_id.as_bytes())
}

/// Reacts to matchmaking events.
pub struct MatchmakingSaga {
    scheduler: Scheduler,
    commands: Arc<CommandBus>,
    sessions: Arc<dyn OwnerLookup>,
    roster: Arc<dyn CompetitorRoster>,
    notifier: Arc<dyn SessionNotifier>,
    settings: GameSessionSettings,
    timings: SagaTimings,
}

impl MatchmakingSaga {
    /// Creates the saga. `sessions` maps matchmakings to the sessions they
    /// produced.
    #[must_use]
    pub fn new(
        scheduler: Scheduler,
        commands: Arc<CommandBus>,
        sessions: Arc<dyn OwnerLookup>,
        roster: Arc<dyn CompetitorRoster>,
        notifier: Arc<dyn SessionNotifier>,
        settings: GameSessionSettings,
        timings: SagaTimings,
    ) -> Self {
        Self {
            scheduler,
            commands,
            sessions,
            roster,
            notifier,
            settings,
            timings,
        }
    }

    async fn start_session(
        &self,
        event: &StoredEvent,
        matchmaking_id: Uuid,
        players: Vec<Uuid>,
    ) -> Result<(), DomainError> {
        let session_id = session_id_for(matchmaking_id);
        let newly_mapped = self.sessions.add_mapping(matchmaking_id, session_id).await?;
        let competitors = self.roster.competitors(players.len());
        self.commands
            .dispatch(CommandEnvelope::new(
                CreateGameSession {
                    session_id,
                    settings: self.settings.clone(),
                    players: players.clone(),
                    competitors,
                },
                MessageContext::caused_by(event),
            ))
            .await?;
        if newly_mapped {
            info!(%session_id, "session started from matchmaking");
            if let Err(error) = self
                .notifier
                .session_started_from_matchmaking(matchmaking_id, session_id, &players)
                .await
            {
                warn!(%error, "matchmaking notification failed");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for MatchmakingSaga {
    fn name(&self) -> &'static str {
        "matchmaking_saga"
    }

    #[instrument(skip_all, fields(
        saga = "matchmaking",
        event_type = %event.event_type,
        correlation_id = %event.correlation_id
    ))]
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let Some(payload) = event.decode::<Matchmaking>()? else {
            return Ok(());
        };
        match payload {
            MatchmakingEvent::MatchmakingCreated(created) => {
                schedule_caused_by(
                    &self.scheduler,
                    event,
                    EndMatchmaking {
                        matchmaking_id: created.matchmaking_id,
                    },
                    self.timings.matchmaking_timeout,
                    format!("matchmaking:{}:end", created.matchmaking_id),
                )
                .await
            }
            MatchmakingEvent::MatchmakingEnded(ended) => {
                self.start_session(event, ended.matchmaking_id, ended.players)
                    .await
            }
            MatchmakingEvent::MatchmakingFailed(failed) => {
                info!(reason = %failed.reason, "matchmaking failed");
                Ok(())
            }
            MatchmakingEvent::PlayerJoined(_) | MatchmakingEvent::PlayerLeft(_) => Ok(()),
        }
    }
}
