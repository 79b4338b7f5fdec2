//! Routes every command type to its handler and every job type to its
//! command.

use std::sync::Arc;

use podium_competition::application::command_handlers::CompetitionCommandHandler;
use podium_competition::domain::commands::{
    CreateCompetition, EndRound, RegisterResult, SimulateAttempt, StartNextRound,
};
use podium_core::error::DomainError;
use podium_draft::application::command_handlers::DraftCommandHandler;
use podium_draft::domain::commands::{AutoPick, CreateDraft, MakePick};
use podium_matchmaking::application::command_handlers::MatchmakingCommandHandler;
use podium_matchmaking::domain::commands::{
    CreateMatchmaking, EndMatchmaking, JoinMatchmaking, LeaveMatchmaking,
};
use podium_messaging::CommandBus;
use podium_scheduler::JobRegistry;
use podium_session::application::command_handlers::GameSessionCommandHandler;
use podium_session::domain::commands::{
    CompleteCompetitionStage, CompleteDraft, CreateGameSession, EndGameSession, StartNextStage,
};

/// One handler per bounded context.
#[derive(Clone)]
pub struct ContextHandlers {
    /// Matchmaking commands.
    pub matchmaking: Arc<MatchmakingCommandHandler>,
    /// Draft commands.
    pub draft: Arc<DraftCommandHandler>,
    /// Competition commands.
    pub competition: Arc<CompetitionCommandHandler>,
    /// Session commands.
    pub session: Arc<GameSessionCommandHandler>,
}

/// Registers a handler for every command type.
///
/// # Errors
///
/// Returns `DomainError::Configuration` if a command type already has a
/// handler on `bus`.
pub fn register_command_handlers(
    bus: &CommandBus,
    handlers: &ContextHandlers,
) -> Result<(), DomainError> {
    bus.register::<CreateMatchmaking>(handlers.matchmaking.clone())?;
    bus.register::<JoinMatchmaking>(handlers.matchmaking.clone())?;
    bus.register::<LeaveMatchmaking>(handlers.matchmaking.clone())?;
    bus.register::<EndMatchmaking>(handlers.matchmaking.clone())?;

    bus.register::<CreateDraft>(handlers.draft.clone())?;
    bus.register::<MakePick>(handlers.draft.clone())?;
    bus.register::<AutoPick>(handlers.draft.clone())?;

    bus.register::<CreateCompetition>(handlers.competition.clone())?;
    bus.register::<RegisterResult>(handlers.competition.clone())?;
    bus.register::<SimulateAttempt>(handlers.competition.clone())?;
    bus.register::<EndRound>(handlers.competition.clone())?;
    bus.register::<StartNextRound>(handlers.competition.clone())?;

    bus.register::<CreateGameSession>(handlers.session.clone())?;
    bus.register::<StartNextStage>(handlers.session.clone())?;
    bus.register::<CompleteCompetitionStage>(handlers.session.clone())?;
    bus.register::<CompleteDraft>(handlers.session.clone())?;
    bus.register::<EndGameSession>(handlers.session.clone())?;
    Ok(())
}

/// Registers every scheduled job type.
///
/// # Errors
///
/// Returns `DomainError::Configuration` if a job type is already registered.
pub fn register_jobs(registry: &mut JobRegistry) -> Result<(), DomainError> {
    registry.register::<StartNextStage>()?;
    registry.register::<EndGameSession>()?;
    registry.register::<SimulateAttempt>()?;
    registry.register::<EndRound>()?;
    registry.register::<StartNextRound>()?;
    registry.register::<AutoPick>()?;
    registry.register::<EndMatchmaking>()?;
    Ok(())
}
