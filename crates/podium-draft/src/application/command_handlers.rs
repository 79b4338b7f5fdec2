//! Command handlers for the draft context.

use async_trait::async_trait;
use podium_core::command::{CommandEnvelope, CommandHandler};
use podium_core::error::DomainError;
use podium_core::repository::AggregateRepository;
use tracing::{debug, info, instrument};

use crate::domain::aggregates::Draft;
use crate::domain::commands::{AutoPick, CreateDraft, MakePick};

/// Handles every draft command.
#[derive(Clone)]
pub struct DraftCommandHandler {
    repo: AggregateRepository<Draft>,
}

impl DraftCommandHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(repo: AggregateRepository<Draft>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CommandHandler<CreateDraft> for DraftCommandHandler {
    #[instrument(skip_all, fields(draft_id = %envelope.command.draft_id))]
    async fn handle(&self, envelope: CommandEnvelope<CreateDraft>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        if self.repo.exists(command.draft_id).await? {
            debug!("draft already exists");
            return Ok(());
        }
        let (draft, events) = Draft::create(
            command.draft_id,
            command.players,
            command.candidates,
            command.picks_per_player,
            command.seed,
        )?;
        self.repo.save(command.draft_id, &events, 0, &context).await?;
        info!(total_picks = draft.total_picks(), "draft opened");
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<MakePick> for DraftCommandHandler {
    #[instrument(skip_all, fields(
        draft_id = %envelope.command.draft_id,
        player_id = %envelope.command.player_id
    ))]
    async fn handle(&self, envelope: CommandEnvelope<MakePick>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.draft_id).await?;
        let (_, events) = loaded
            .state
            .make_pick(command.player_id, command.competitor_id)?;
        self.repo
            .save(command.draft_id, &events, loaded.version, &context)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<AutoPick> for DraftCommandHandler {
    #[instrument(skip_all, fields(
        draft_id = %envelope.command.draft_id,
        pick_index = envelope.command.pick_index
    ))]
    async fn handle(&self, envelope: CommandEnvelope<AutoPick>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.draft_id).await?;
        let on_the_clock = loaded.state.next_pick().map(|next| next.pick_index);
        if on_the_clock != Some(command.pick_index) {
            debug!(?on_the_clock, "pick already made");
            return Ok(());
        }
        let (draft, events) = loaded.state.auto_pick(command.pick_index)?;
        self.repo
            .save(command.draft_id, &events, loaded.version, &context)
            .await?;
        if let Some(pick) = draft.picks.last() {
            info!(competitor_id = %pick.competitor_id, "auto-picked");
        }
        Ok(())
    }
}
