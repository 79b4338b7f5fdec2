//! Domain events of the `GameCompetition` aggregate.

use podium_core::event::EventPayload;
use podium_core::rng::SeededRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::{CompetitionConfig, Competitor};
use super::results::{ClassificationResult, JumpResult};

/// Emitted when a competition is created; round 0 opens immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionStarted {
    /// The competition identifier.
    pub competition_id: Uuid,
    /// Configuration, carried by value.
    pub config: CompetitionConfig,
    /// Entry list in registration order.
    pub competitors: Vec<Competitor>,
    /// Seed of the engine's generator.
    pub seed: u64,
    /// Startlist of round 0.
    pub startlist: Vec<Uuid>,
}

/// Emitted when an attempt is scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRegistered {
    /// Round the result belongs to.
    pub round_index: usize,
    /// The scored attempt.
    pub result: JumpResult,
    /// Next competitor still waiting in this round.
    pub next_pending: Option<Uuid>,
    /// Whether this was the last pending attempt of the round.
    pub round_complete: bool,
}

/// Emitted when a round is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEnded {
    /// Round that ended.
    pub round_index: usize,
    /// Competitors carried into the next round; empty after the last round.
    pub advancing: Vec<Uuid>,
    /// Set when the engine now waits for an explicit start of that round.
    pub waiting_for: Option<usize>,
    /// Generator state after any tie-break draws.
    pub rng: SeededRng,
}

/// Emitted when a later round opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextRoundStarted {
    /// Round that opened.
    pub round_index: usize,
    /// Its startlist.
    pub startlist: Vec<Uuid>,
}

/// Emitted once the last round has ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionEnded {
    /// The competition identifier.
    pub competition_id: Uuid,
    /// Final classification.
    pub results: Vec<ClassificationResult>,
}

/// Event payload variants for the competition context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CompetitionEvent {
    /// The competition was created.
    CompetitionStarted(CompetitionStarted),
    /// An attempt was scored.
    ResultRegistered(ResultRegistered),
    /// A round was closed.
    RoundEnded(RoundEnded),
    /// A later round opened.
    NextRoundStarted(NextRoundStarted),
    /// The competition finished.
    CompetitionEnded(CompetitionEnded),
}

impl EventPayload for CompetitionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::CompetitionStarted(_) => "competition.started",
            Self::ResultRegistered(_) => "competition.result_registered",
            Self::RoundEnded(_) => "competition.round_ended",
            Self::NextRoundStarted(_) => "competition.next_round_started",
            Self::CompetitionEnded(_) => "competition.ended",
        }
    }
}
