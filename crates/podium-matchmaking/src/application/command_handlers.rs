//! Command handlers for the matchmaking context.

use async_trait::async_trait;
use podium_core::command::{CommandEnvelope, CommandHandler};
use podium_core::error::DomainError;
use podium_core::repository::AggregateRepository;
use tracing::{debug, info, instrument};

use crate::domain::aggregates::{Matchmaking, MatchmakingPhase};
use crate::domain::commands::{
    CreateMatchmaking, EndMatchmaking, JoinMatchmaking, LeaveMatchmaking,
};

/// Handles every matchmaking command.
#[derive(Clone)]
pub struct MatchmakingCommandHandler {
    repo: AggregateRepository<Matchmaking>,
}

impl MatchmakingCommandHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(repo: AggregateRepository<Matchmaking>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CommandHandler<CreateMatchmaking> for MatchmakingCommandHandler {
    #[instrument(skip_all, fields(matchmaking_id = %envelope.command.matchmaking_id))]
    async fn handle(&self, envelope: CommandEnvelope<CreateMatchmaking>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        if self.repo.exists(command.matchmaking_id).await? {
            debug!("matchmaking already exists");
            return Ok(());
        }
        let (_, events) = Matchmaking::create(
            command.matchmaking_id,
            command.min_players,
            command.max_players,
        )?;
        self.repo
            .save(command.matchmaking_id, &events, 0, &context)
            .await?;
        info!("matchmaking opened");
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<JoinMatchmaking> for MatchmakingCommandHandler {
    #[instrument(skip_all, fields(
        matchmaking_id = %envelope.command.matchmaking_id,
        player_id = %envelope.command.player_id
    ))]
    async fn handle(&self, envelope: CommandEnvelope<JoinMatchmaking>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.matchmaking_id).await?;
        let (_, events) = loaded.state.join(command.player_id)?;
        self.repo
            .save(command.matchmaking_id, &events, loaded.version, &context)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<LeaveMatchmaking> for MatchmakingCommandHandler {
    #[instrument(skip_all, fields(
        matchmaking_id = %envelope.command.matchmaking_id,
        player_id = %envelope.command.player_id
    ))]
    async fn handle(&self, envelope: CommandEnvelope<LeaveMatchmaking>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.matchmaking_id).await?;
        let (_, events) = loaded.state.leave(command.player_id)?;
        self.repo
            .save(command.matchmaking_id, &events, loaded.version, &context)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<EndMatchmaking> for MatchmakingCommandHandler {
    #[instrument(skip_all, fields(matchmaking_id = %envelope.command.matchmaking_id))]
    async fn handle(&self, envelope: CommandEnvelope<EndMatchmaking>) -> Result<(), DomainError> {
        let CommandEnvelope { command, context } = envelope;
        let loaded = self.repo.load_existing(command.matchmaking_id).await?;
        if loaded.state.phase != MatchmakingPhase::Open {
            debug!(phase = ?loaded.state.phase, "matchmaking already closed");
            return Ok(());
        }
        let (closed, events) = loaded.state.end()?;
        self.repo
            .save(command.matchmaking_id, &events, loaded.version, &context)
            .await?;
        info!(phase = ?closed.phase, players = closed.players.len(), "matchmaking closed");
        Ok(())
    }
}
