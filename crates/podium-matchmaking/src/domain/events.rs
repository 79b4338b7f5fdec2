//! Domain events for the matchmaking context.

use podium_core::event::EventPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when a matchmaking opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakingCreated {
    /// The matchmaking identifier.
    pub matchmaking_id: Uuid,
    /// Players required to start a session.
    pub min_players: u32,
    /// Players at which the matchmaking closes on its own.
    pub max_players: u32,
}

/// Emitted when a player joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoined {
    /// The player.
    pub player_id: Uuid,
}

/// Emitted when a player leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeft {
    /// The player.
    pub player_id: Uuid,
}

/// Emitted when the matchmaking closes with enough players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakingEnded {
    /// The matchmaking identifier.
    pub matchmaking_id: Uuid,
    /// Final roster in join order.
    pub players: Vec<Uuid>,
}

/// Emitted when the matchmaking closes without enough players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakingFailed {
    /// The matchmaking identifier.
    pub matchmaking_id: Uuid,
    /// Why it failed.
    pub reason: String,
}

/// Event payload variants for the matchmaking context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MatchmakingEvent {
    /// A matchmaking opened.
    MatchmakingCreated(MatchmakingCreated),
    /// A player joined.
    PlayerJoined(PlayerJoined),
    /// A player left.
    PlayerLeft(PlayerLeft),
    /// The matchmaking closed with a roster.
    MatchmakingEnded(MatchmakingEnded),
    /// The matchmaking closed without a roster.
    MatchmakingFailed(MatchmakingFailed),
}

impl EventPayload for MatchmakingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::MatchmakingCreated(_) => "matchmaking.created",
            Self::PlayerJoined(_) => "matchmaking.player_joined",
            Self::PlayerLeft(_) => "matchmaking.player_left",
            Self::MatchmakingEnded(_) => "matchmaking.ended",
            Self::MatchmakingFailed(_) => "matchmaking.failed",
        }
    }
}
