//! Commands for the draft context.

use podium_core::command::Command;
use podium_core::job::ScheduledCommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::DraftCandidate;

/// Opens a draft. A no-op when the draft already exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDraft {
    /// The draft to open.
    pub draft_id: Uuid,
    /// Players in first-round order.
    pub players: Vec<Uuid>,
    /// Candidate pool with auto-pick weights.
    pub candidates: Vec<DraftCandidate>,
    /// Picks each player makes.
    pub picks_per_player: u32,
    /// Seed for auto-picks.
    pub seed: u64,
}

impl Command for CreateDraft {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "draft.create"
    }
}

/// A player's own pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakePick {
    /// Target draft.
    pub draft_id: Uuid,
    /// Picking player.
    pub player_id: Uuid,
    /// Competitor picked.
    pub competitor_id: Uuid,
}

impl Command for MakePick {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "draft.make_pick"
    }
}

/// Pick timer expiry. A no-op when the pick has already been made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPick {
    /// Target draft.
    pub draft_id: Uuid,
    /// The pick whose timer expired.
    pub pick_index: u32,
}

impl Command for AutoPick {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "draft.auto_pick"
    }
}

impl ScheduledCommand for AutoPick {
    const JOB_TYPE: &'static str = "AutoPick";
}
