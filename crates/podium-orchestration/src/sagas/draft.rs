//! Draft saga: arms the pick timer for every pick and hands the finished
//! draft back to the session.

use std::sync::Arc;

use async_trait::async_trait;
use podium_core::bus::EventHandler;
use podium_core::command::{CommandEnvelope, MessageContext};
use podium_core::error::DomainError;
use podium_core::repository::StoredEvent;
use podium_draft::domain::aggregates::Draft;
use podium_draft::domain::commands::AutoPick;
use podium_draft::domain::events::{DraftEvent, NextPick};
use podium_messaging::CommandBus;
use podium_scheduler::Scheduler;
use podium_session::domain::commands::CompleteDraft;
use podium_session::domain::events::DraftedCompetitor;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::schedule_caused_by;
use crate::lookup::{OwnerLookup, OwnerLookupResult};
use crate::timings::SagaTimings;

/// Reacts to draft events.
pub struct DraftSaga {
    scheduler: Scheduler,
    commands: Arc<CommandBus>,
    sessions: Arc<dyn OwnerLookup>,
    timings: SagaTimings,
}

impl DraftSaga {
    /// Creates the saga. `sessions` maps drafts to their session.
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

    async fn arm_pick_timer(
        &self,
        event: &StoredEvent,
        draft_id: Uuid,
        next: NextPick,
    ) -> Result<(), DomainError> {
        schedule_caused_by(
            &self.scheduler,
            event,
            AutoPick {
                draft_id,
                pick_index: next.pick_index,
            },
            self.timings.pick_timeout,
            format!("draft:{draft_id}:pick:{}", next.pick_index),
        )
        .await
    }
}

#[async_trait]
impl EventHandler for DraftSaga {
    fn name(&self) -> &'static str {
        "draft_saga"
    }

    #[instrument(skip_all, fields(
        saga = "draft",
        draft_id = %event.aggregate_id,
        event_type = %event.event_type,
        correlation_id = %event.correlation_id
    ))]
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let Some(payload) = event.decode::<Draft>()? else {
            return Ok(());
        };
        let draft_id = event.aggregate_id;
        match payload {
            DraftEvent::DraftCreated(created) => {
                self.arm_pick_timer(event, draft_id, created.next_pick).await
            }
            DraftEvent::PickMade(made) => match made.next_pick {
                Some(next) => self.arm_pick_timer(event, draft_id, next).await,
                None => Ok(()),
            },
            DraftEvent::DraftEnded(ended) => match self.sessions.try_get_owner(draft_id).await? {
                OwnerLookupResult::Found(session_id) => {
                    let picks = ended
                        .picks
                        .iter()
                        .map(|pick| DraftedCompetitor {
                            player_id: pick.player_id,
                            competitor_id: pick.competitor_id,
                        })
                        .collect();
                    self.commands
                        .dispatch(CommandEnvelope::new(
                            CompleteDraft {
                                session_id,
                                draft_id,
                                picks,
                            },
                            MessageContext::caused_by(event),
                        ))
                        .await
                }
                OwnerLookupResult::NotFound => {
                    debug!("draft has no owning session");
                    Ok(())
                }
            },
        }
    }
}
