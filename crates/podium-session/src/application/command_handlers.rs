//! Command handlers for the session context.
//!
//! Each handler loads the session, decides, saves with the loaded version
//! and pushes the new view to the notifier. Commands that arrive after the
//! session has moved on are acknowledged without effect.

use std::sync::Arc;

use async_trait::async_trait;
use podium_competition::domain::results::ClassificationResult;
use podium_core::command::{CommandEnvelope, CommandHandler};
use podium_core::error::DomainError;
use podium_core::repository::{AggregateRepository, StoredEvent};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::archive::{GameCompetitionResultsArchive, StageResults};
use super::dto::GameSessionDto;
use super::notifier::SessionNotifier;
use crate::domain::aggregates::{GameSession, StageKind, StageRecord};
use crate::domain::commands::{
    CompleteCompetitionStage, CompleteDraft, CreateGameSession, EndGameSession, StartNextStage,
};
use crate::domain::phases::NextStage;

/// Handles every session command.
#[derive(Clone)]
pub struct GameSessionCommandHandler {
    repo: AggregateRepository<GameSession>,
    archive: GameCompetitionResultsArchive,
    notifier: Arc<dyn SessionNotifier>,
}

impl GameSessionCommandHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(
        repo: AggregateRepository<GameSession>,
        archive: GameCompetitionResultsArchive,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Self {
        Self {
            repo,
            archive,
            notifier,
        }
    }

    async fn notify_updated(&self, session: &GameSession, stored: &[StoredEvent], base: i64) {
        let version = stored.last().map_or(base, |event| event.sequence_number);
        let dto = GameSessionDto::from_session(session, version);
        if let Err(error) = self.notifier.session_updated(&dto).await {
            warn!(session_id = %session.id, %error, "session update notification failed");
        }
    }

    async fn archived(
        &self,
        session_id: Uuid,
        stages: &[StageRecord],
    ) -> Result<Vec<Vec<ClassificationResult>>, DomainError> {
        let mut results = Vec::with_capacity(stages.len());
        for stage in stages {
            let entry = self
                .archive
                .load_existing(session_id, stage.stage_ordinal)
                .await?;
            results.push(entry.results);
        }
        Ok(results)
    }
}

#[async_trait]
impl CommandHandler<CreateGameSession> for GameSessionCommandHandler {
    #[instrument(skip_all, fields(session_id = %envelope.command.session_id))]
    async fn handle(&self, envelope: CommandEnvelope<CreateGameSession>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        if self.repo.exists(command.session_id).await? {
            debug!("session already exists");
            return Ok(());
        }
        let (session, events) = GameSession::create(
            command.session_id,
            command.settings,
            command.players,
            command.competitors,
        )?;
        let stored = match self.repo.save(command.session_id, &events, 0, &context).await {
            Ok(stored) => stored,
            Err(error) if error.is_conflict() => {
                debug!("session created concurrently");
                return Ok(());
            }
            Err(error) => return Err(error),
        };
        info!(players = session.players.len(), "session created");
        self.notify_updated(&session, &stored, 0).await;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<StartNextStage> for GameSessionCommandHandler {
    #[instrument(skip_all, fields(
        session_id = %envelope.command.session_id,
        stage = %envelope.command.stage
    ))]
    async fn handle(&self, envelope: CommandEnvelope<StartNextStage>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.session_id).await?;
        let next = command.stage;
        if next == NextStage::Ended || loaded.state.phase.pending_stage() != Some(next) {
            debug!(phase = %loaded.state.phase, stage = %next, "not in the break before this stage");
            return Ok(());
        }
        let pre_draft = if next == NextStage::Draft {
            self.archived(command.session_id, &loaded.state.completed_pre_draft())
                .await?
        } else {
            Vec::new()
        };
        let (session, events) = loaded.state.start_next_stage(Uuid::new_v4(), &pre_draft)?;
        let stored = self
            .repo
            .save(command.session_id, &events, loaded.version, &context)
            .await?;
        info!(stage = %next, "stage started");
        self.notify_updated(&session, &stored, loaded.version).await;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<CompleteCompetitionStage> for GameSessionCommandHandler {
    #[instrument(skip_all, fields(
        session_id = %envelope.command.session_id,
        competition_id = %envelope.command.competition_id
    ))]
    async fn handle(
        &self,
        envelope: CommandEnvelope<CompleteCompetitionStage>,
    ) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.session_id).await?;
        let Some(stage) = loaded.state.current_stage().copied().filter(|stage| {
            matches!(stage.kind, StageKind::Competition(_))
                && stage.child_id == command.competition_id
        }) else {
            debug!(phase = %loaded.state.phase, "competition stage is not running");
            return Ok(());
        };
        self.archive
            .store(&StageResults {
                session_id: command.session_id,
                stage_ordinal: stage.stage_ordinal,
                competition_id: command.competition_id,
                results: command.results,
            })
            .await?;
        let (session, events) = loaded
            .state
            .complete_competition_stage(command.competition_id)?;
        let stored = self
            .repo
            .save(command.session_id, &events, loaded.version, &context)
            .await?;
        info!(stage_ordinal = stage.stage_ordinal, phase = %session.phase, "competition stage completed");
        self.notify_updated(&session, &stored, loaded.version).await;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<CompleteDraft> for GameSessionCommandHandler {
    #[instrument(skip_all, fields(
        session_id = %envelope.command.session_id,
        draft_id = %envelope.command.draft_id
    ))]
    async fn handle(&self, envelope: CommandEnvelope<CompleteDraft>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.session_id).await?;
        let running = loaded
            .state
            .current_stage()
            .is_some_and(|stage| stage.kind == StageKind::Draft && stage.child_id == command.draft_id);
        if !running {
            debug!(phase = %loaded.state.phase, "draft is not running");
            return Ok(());
        }
        let (session, events) = loaded
            .state
            .complete_draft(command.draft_id, command.picks)?;
        let stored = self
            .repo
            .save(command.session_id, &events, loaded.version, &context)
            .await?;
        info!(picks = session.picks.len(), "draft completed");
        self.notify_updated(&session, &stored, loaded.version).await;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<EndGameSession> for GameSessionCommandHandler {
    #[instrument(skip_all, fields(session_id = %envelope.command.session_id))]
    async fn handle(&self, envelope: CommandEnvelope<EndGameSession>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.session_id).await?;
        if loaded.state.phase.pending_stage() != Some(NextStage::Ended) {
            debug!(phase = %loaded.state.phase, "session is not waiting to end");
            return Ok(());
        }
        let scoring = self
            .archived(command.session_id, &loaded.state.completed_scoring())
            .await?;
        let (session, events) = loaded.state.end(&scoring)?;
        let stored = self
            .repo
            .save(command.session_id, &events, loaded.version, &context)
            .await?;
        if let Some(winner) = session.ranking.as_ref().and_then(|ranking| ranking.first()) {
            info!(winner = %winner.player_id, points = winner.points, "session ended");
        }
        self.notify_updated(&session, &stored, loaded.version).await;
        if let Err(error) = self.notifier.session_ended(session.id).await {
            warn!(%error, "session end notification failed");
        }
        Ok(())
    }
}
