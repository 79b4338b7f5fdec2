//! Domain events for the session context.

use podium_competition::domain::config::{CompetitionConfig, Competitor};
use podium_core::event::EventPayload;
use podium_draft::domain::events::DraftCandidate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phases::{CompetitionStage, NextStage};
use super::ranking::PlayerStanding;
use super::settings::GameSessionSettings;

/// A competitor a player drafted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftedCompetitor {
    /// The drafting player.
    pub player_id: Uuid,
    /// The drafted competitor.
    pub competitor_id: Uuid,
}

/// Emitted when a session is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSessionCreated {
    /// The session identifier.
    pub session_id: Uuid,
    /// How the session runs.
    pub settings: GameSessionSettings,
    /// Players in seating order.
    pub players: Vec<Uuid>,
    /// The competitor field.
    pub competitors: Vec<Competitor>,
    /// The stage that starts after the opening break.
    pub first_stage: NextStage,
}

/// Emitted when a competition-backed stage starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionStageStarted {
    /// Which stage.
    pub stage: CompetitionStage,
    /// Ordinal of the stage within the session.
    pub stage_ordinal: u32,
    /// The competition running the stage.
    pub competition_id: Uuid,
    /// Its configuration.
    pub config: CompetitionConfig,
    /// Its entry list.
    pub competitors: Vec<Competitor>,
    /// Its seed.
    pub seed: u64,
}

/// Emitted when the draft stage starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftStageStarted {
    /// Ordinal of the stage within the session.
    pub stage_ordinal: u32,
    /// The draft running the stage.
    pub draft_id: Uuid,
    /// Players in first-round pick order.
    pub players: Vec<Uuid>,
    /// Candidates weighted by pre-draft form.
    pub candidates: Vec<DraftCandidate>,
    /// Picks each player makes.
    pub picks_per_player: u32,
    /// Seed for auto-picks.
    pub seed: u64,
}

/// Emitted once a competition-backed stage's results are archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionStageCompleted {
    /// Ordinal of the stage within the session.
    pub stage_ordinal: u32,
    /// The competition that ran the stage.
    pub competition_id: Uuid,
    /// The stage after the break.
    pub next: NextStage,
}

/// Emitted when the draft finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCompleted {
    /// The draft that ran the stage.
    pub draft_id: Uuid,
    /// Every pick in order.
    pub picks: Vec<DraftedCompetitor>,
    /// The stage after the break.
    pub next: NextStage,
}

/// Emitted when the session is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSessionEnded {
    /// The session identifier.
    pub session_id: Uuid,
    /// The final ranking.
    pub ranking: Vec<PlayerStanding>,
}

/// Event payload variants for the session context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GameSessionEvent {
    /// The session was created.
    GameSessionCreated(GameSessionCreated),
    /// A competition-backed stage started.
    CompetitionStageStarted(CompetitionStageStarted),
    /// The draft stage started.
    DraftStageStarted(DraftStageStarted),
    /// A competition-backed stage completed.
    CompetitionStageCompleted(CompetitionStageCompleted),
    /// The draft completed.
    DraftCompleted(DraftCompleted),
    /// The session was settled.
    GameSessionEnded(GameSessionEnded),
}

impl EventPayload for GameSessionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::GameSessionCreated(_) => "session.created",
            Self::CompetitionStageStarted(_) => "session.competition_stage_started",
            Self::DraftStageStarted(_) => "session.draft_stage_started",
            Self::CompetitionStageCompleted(_) => "session.competition_stage_completed",
            Self::DraftCompleted(_) => "session.draft_completed",
            Self::GameSessionEnded(_) => "session.ended",
        }
    }
}
