//! Query handlers for the session context.

use podium_core::error::DomainError;
use podium_core::repository::AggregateRepository;
use uuid::Uuid;

use super::dto::GameSessionDto;
use crate::domain::aggregates::GameSession;

/// Returns the read model of a session.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
pub async fn get_game_session_by_id(
    session_id: Uuid,
    repo: &AggregateRepository<GameSession>,
) -> Result<GameSessionDto, DomainError> {
    let loaded = repo.load_existing(session_id).await?;
    Ok(GameSessionDto::from_session(&loaded.state, loaded.version))
}
