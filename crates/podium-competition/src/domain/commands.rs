//! Commands for the competition context.

use podium_core::command::Command;
use podium_core::job::ScheduledCommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::{CompetitionConfig, Competitor};
use super::scoring::Attempt;

/// Creates a competition. A no-op if it already exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompetition {
    /// The competition to create.
    pub competition_id: Uuid,
    /// Configuration.
    pub config: CompetitionConfig,
    /// Entry list in registration order.
    pub competitors: Vec<Competitor>,
    /// Seed of the engine's generator.
    pub seed: u64,
}

impl Command for CreateCompetition {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "competition.create"
    }
}

/// Registers an externally submitted attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResult {
    /// Target competition.
    pub competition_id: Uuid,
    /// Who jumped.
    pub competitor_id: Uuid,
    /// The attempt.
    pub attempt: Attempt,
}

impl Command for RegisterResult {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "competition.register_result"
    }
}

/// Simulates and registers the attempt of a pending competitor. A no-op if
/// the competitor is no longer pending in that round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulateAttempt {
    /// Target competition.
    pub competition_id: Uuid,
    /// Round the attempt belongs to.
    pub round_index: usize,
    /// Who jumps.
    pub competitor_id: Uuid,
}

impl Command for SimulateAttempt {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "competition.simulate_attempt"
    }
}

impl ScheduledCommand for SimulateAttempt {
    const JOB_TYPE: &'static str = "SimulateAttempt";
}

/// Closes a round. A no-op unless that round is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndRound {
    /// Target competition.
    pub competition_id: Uuid,
    /// Round to close.
    pub round_index: usize,
}

impl Command for EndRound {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "competition.end_round"
    }
}

impl ScheduledCommand for EndRound {
    const JOB_TYPE: &'static str = "EndRound";
}

/// Opens a waiting round. A no-op unless the engine waits for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartNextRound {
    /// Target competition.
    pub competition_id: Uuid,
    /// Round to open.
    pub round_index: usize,
}

impl Command for StartNextRound {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "competition.start_next_round"
    }
}

impl ScheduledCommand for StartNextRound {
    const JOB_TYPE: &'static str = "StartNextRound";
}
