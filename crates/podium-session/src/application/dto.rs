//! Flattened, versioned read model of a session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{GameSession, StageKind};
use crate::domain::events::DraftedCompetitor;
use crate::domain::ranking::PlayerStanding;

/// Version of the [`GameSessionDto`] shape.
pub const GAME_SESSION_DTO_SCHEMA_VERSION: u32 = 1;

/// What clients see of a session. Independent of the aggregate's internal
/// representation; bump [`GAME_SESSION_DTO_SCHEMA_VERSION`] on any change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSessionDto {
    /// Shape version.
    pub schema_version: u32,
    /// The session identifier.
    pub session_id: Uuid,
    /// Stream version the view reflects.
    pub version: i64,
    /// Phase name, e.g. `draft` or `break:main-competition`.
    pub phase: String,
    /// Stages started so far.
    pub stages_started: u32,
    /// Competition running right now.
    pub current_competition_id: Option<Uuid>,
    /// Draft running right now.
    pub current_draft_id: Option<Uuid>,
    /// Players in seating order.
    pub players: Vec<Uuid>,
    /// Draft picks.
    pub picks: Vec<DraftedCompetitor>,
    /// Settlement, once ended.
    pub ranking: Option<Vec<PlayerStanding>>,
}

impl GameSessionDto {
    /// Builds the view of `session` at `version`.
    #[must_use]
    pub fn from_session(session: &GameSession, version: i64) -> Self {
        let current = session.current_stage();
        Self {
            schema_version: GAME_SESSION_DTO_SCHEMA_VERSION,
            session_id: session.id,
            version,
            phase: session.phase.to_string(),
            stages_started: session.next_ordinal(),
            current_competition_id: current
                .filter(|stage| matches!(stage.kind, StageKind::Competition(_)))
                .map(|stage| stage.child_id),
            current_draft_id: current
                .filter(|stage| stage.kind == StageKind::Draft)
                .map(|stage| stage.child_id),
            players: session.players.clone(),
            picks: session.picks.clone(),
            ranking: session.ranking.clone(),
        }
    }
}
