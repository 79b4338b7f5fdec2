//! Commands for the session context.

use podium_competition::domain::config::Competitor;
use podium_competition::domain::results::ClassificationResult;
use podium_core::command::Command;
use podium_core::job::ScheduledCommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::DraftedCompetitor;
use super::phases::NextStage;
use super::settings::GameSessionSettings;

/// Creates a session. A no-op when it already exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameSession {
    /// The session to create.
    pub session_id: Uuid,
    /// How it runs.
    pub settings: GameSessionSettings,
    /// Players in seating order.
    pub players: Vec<Uuid>,
    /// The competitor field.
    pub competitors: Vec<Competitor>,
}

impl Command for CreateGameSession {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "session.create"
    }
}

/// Ends the break leading to `stage` by starting it. A no-op unless the
/// session is in exactly that break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartNextStage {
    /// Target session.
    pub session_id: Uuid,
    /// The stage the break leads to.
    pub stage: NextStage,
}

impl Command for StartNextStage {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "session.start_next_stage"
    }
}

impl ScheduledCommand for StartNextStage {
    const JOB_TYPE: &'static str = "StartNextStage";
}

/// Archives a finished competition stage and opens the following break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteCompetitionStage {
    /// Target session.
    pub session_id: Uuid,
    /// The competition that finished.
    pub competition_id: Uuid,
    /// Its final classification.
    pub results: Vec<ClassificationResult>,
}

impl Command for CompleteCompetitionStage {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "session.complete_competition_stage"
    }
}

/// Records the draft picks and opens the break before the main competition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteDraft {
    /// Target session.
    pub session_id: Uuid,
    /// The draft that finished.
    pub draft_id: Uuid,
    /// Every pick in order.
    pub picks: Vec<DraftedCompetitor>,
}

impl Command for CompleteDraft {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "session.complete_draft"
    }
}

/// Settles the session. A no-op unless the session waits to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndGameSession {
    /// Target session.
    pub session_id: Uuid,
}

impl Command for EndGameSession {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "session.end"
    }
}

impl ScheduledCommand for EndGameSession {
    const JOB_TYPE: &'static str = "EndSession";
}
