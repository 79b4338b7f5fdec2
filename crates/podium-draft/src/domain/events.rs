//! Domain events for the draft context.

use podium_core::event::EventPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A competitor available in the draft with its auto-pick weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DraftCandidate {
    /// The competitor.
    pub competitor_id: Uuid,
    /// Relative auto-pick weight; better form weighs more.
    pub weight: f64,
}

/// A pick that was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    /// Zero-based overall pick number.
    pub pick_index: u32,
    /// Player who picked.
    pub player_id: Uuid,
    /// Competitor picked.
    pub competitor_id: Uuid,
    /// Whether the pick was made by timeout.
    pub auto: bool,
}

/// The pick that is up next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPick {
    /// Zero-based overall pick number.
    pub pick_index: u32,
    /// Player on the clock.
    pub player_id: Uuid,
}

/// Emitted when a draft opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftCreated {
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Players in first-round order.
    pub players: Vec<Uuid>,
    /// Candidate pool.
    pub candidates: Vec<DraftCandidate>,
    /// Picks each player makes.
    pub picks_per_player: u32,
    /// Seed for auto-picks.
    pub seed: u64,
    /// The first pick.
    pub next_pick: NextPick,
}

/// Emitted for every pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickMade {
    /// The pick.
    pub pick: Pick,
    /// The pick that is up next; `None` after the last pick.
    pub next_pick: Option<NextPick>,
}

/// Emitted after the last pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEnded {
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Every pick in order.
    pub picks: Vec<Pick>,
}

/// Event payload variants for the draft context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DraftEvent {
    /// The draft opened.
    DraftCreated(DraftCreated),
    /// A pick was made.
    PickMade(PickMade),
    /// The draft finished.
    DraftEnded(DraftEnded),
}

impl EventPayload for DraftEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::DraftCreated(_) => "draft.created",
            Self::PickMade(_) => "draft.pick_made",
            Self::DraftEnded(_) => "draft.ended",
        }
    }
}
