//! Commands for the matchmaking context.

use podium_core::command::Command;
use podium_core::job::ScheduledCommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opens a matchmaking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatchmaking {
    /// The matchmaking to open.
    pub matchmaking_id: Uuid,
    /// Players required to start a session.
    pub min_players: u32,
    /// Players at which it closes on its own.
    pub max_players: u32,
}

impl Command for CreateMatchmaking {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "matchmaking.create"
    }
}

/// Adds a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinMatchmaking {
    /// Target matchmaking.
    pub matchmaking_id: Uuid,
    /// Joining player.
    pub player_id: Uuid,
}

impl Command for JoinMatchmaking {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "matchmaking.join"
    }
}

/// Removes a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveMatchmaking {
    /// Target matchmaking.
    pub matchmaking_id: Uuid,
    /// Leaving player.
    pub player_id: Uuid,
}

impl Command for LeaveMatchmaking {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "matchmaking.leave"
    }
}

/// Closes a matchmaking. A no-op once it is closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndMatchmaking {
    /// Target matchmaking.
    pub matchmaking_id: Uuid,
}

impl Command for EndMatchmaking {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "matchmaking.end"
    }
}

impl ScheduledCommand for EndMatchmaking {
    const JOB_TYPE: &'static str = "EndMatchmaking";
}
