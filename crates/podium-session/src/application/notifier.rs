//! Outbound notification boundary.
//!
//! The only place the core pushes session data to a real-time channel.
//! Delivery is best effort: callers log failures and carry on.

use async_trait::async_trait;
use podium_core::error::DomainError;
use tracing::info;
use uuid::Uuid;

use super::dto::GameSessionDto;

/// Pushes session changes to connected clients.
#[async_trait]
pub trait SessionNotifier: Send + Sync {
    /// A matchmaking produced a session.
    async fn session_started_from_matchmaking(
        &self,
        matchmaking_id: Uuid,
        session_id: Uuid,
        players: &[Uuid],
    ) -> Result<(), DomainError>;

    /// A session changed.
    async fn session_updated(&self, session: &GameSessionDto) -> Result<(), DomainError>;

    /// A session was settled.
    async fn session_ended(&self, session_id: Uuid) -> Result<(), DomainError>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSessionNotifier;

#[async_trait]
impl SessionNotifier for TracingSessionNotifier {
    async fn session_started_from_matchmaking(
        &self,
        matchmaking_id: Uuid,
        session_id: Uuid,
        players: &[Uuid],
    ) -> Result<(), DomainError> {
        info!(%matchmaking_id, %session_id, players = players.len(), "session started from matchmaking");
        Ok(())
    }

    async fn session_updated(&self, session: &GameSessionDto) -> Result<(), DomainError> {
        info!(
            session_id = %session.session_id,
            version = session.version,
            phase = %session.phase,
            "session updated"
        );
        Ok(())
    }

    async fn session_ended(&self, session_id: Uuid) -> Result<(), DomainError> {
        info!(%session_id, "session ended");
        Ok(())
    }
}
