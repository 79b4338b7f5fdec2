//! Aggregate root for the matchmaking context.

use podium_core::aggregate::{AggregateRoot, create, transition, unexpected_payload};
use podium_core::error::DomainError;
use podium_core::event::EventPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    MatchmakingCreated, MatchmakingEnded, MatchmakingEvent, MatchmakingFailed, PlayerJoined,
    PlayerLeft,
};

/// Matchmaking phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchmakingPhase {
    /// Accepting players.
    Open,
    /// Closed with a roster.
    Ended,
    /// Closed without enough players.
    Failed,
}

/// The aggregate root for a matchmaking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchmaking {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Players required to start a session.
    pub min_players: u32,
    /// Players at which the matchmaking closes on its own.
    pub max_players: u32,
    /// Current roster in join order.
    pub players: Vec<Uuid>,
    /// Current phase.
    pub phase: MatchmakingPhase,
}

/// Outcome of a matchmaking operation.
pub type Decision = (Matchmaking, Vec<MatchmakingEvent>);

impl Matchmaking {
    /// Opens a matchmaking.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless `1 <= min_players <= max_players`.
    pub fn create(id: Uuid, min_players: u32, max_players: u32) -> Result<Decision, DomainError> {
        if min_players == 0 || min_players > max_players {
            return Err(DomainError::Validation(format!(
                "invalid player bounds {min_players}..={max_players}"
            )));
        }
        create::<Self>(vec![MatchmakingEvent::MatchmakingCreated(
            MatchmakingCreated {
                matchmaking_id: id,
                min_players,
                max_players,
            },
        )])
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.phase == MatchmakingPhase::Open {
            Ok(())
        } else {
            Err(DomainError::InvalidPhase(format!(
                "matchmaking {} is closed",
                self.id
            )))
        }
    }

    fn player_count(&self) -> u32 {
        u32::try_from(self.players.len()).unwrap_or(u32::MAX)
    }

    /// Adds a player; the matchmaking ends as soon as it is full.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` once closed and
    /// `DomainError::PolicyViolation` for a player already in.
    pub fn join(&self, player_id: Uuid) -> Result<Decision, DomainError> {
        self.ensure_open()?;
        if self.players.contains(&player_id) {
            return Err(DomainError::PolicyViolation(format!(
                "player {player_id} already joined"
            )));
        }
        let mut events = vec![MatchmakingEvent::PlayerJoined(PlayerJoined { player_id })];
        if self.player_count() + 1 >= self.max_players {
            let mut players = self.players.clone();
            players.push(player_id);
            events.push(MatchmakingEvent::MatchmakingEnded(MatchmakingEnded {
                matchmaking_id: self.id,
                players,
            }));
        }
        transition(self, events)
    }

    /// Removes a player.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` once closed and
    /// `DomainError::NotFound` for a player who is not in.
    pub fn leave(&self, player_id: Uuid) -> Result<Decision, DomainError> {
        self.ensure_open()?;
        if !self.players.contains(&player_id) {
            return Err(DomainError::NotFound(format!(
                "player {player_id} in matchmaking {}",
                self.id
            )));
        }
        transition(self, vec![MatchmakingEvent::PlayerLeft(PlayerLeft { player_id })])
    }

    /// Closes the matchmaking: ended with a roster if enough players joined,
    /// failed otherwise.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` once closed.
    pub fn end(&self) -> Result<Decision, DomainError> {
        self.ensure_open()?;
        let event = if self.player_count() >= self.min_players {
            MatchmakingEvent::MatchmakingEnded(MatchmakingEnded {
                matchmaking_id: self.id,
                players: self.players.clone(),
            })
        } else {
            MatchmakingEvent::MatchmakingFailed(MatchmakingFailed {
                matchmaking_id: self.id,
                reason: format!(
                    "{} of {} required players joined",
                    self.players.len(),
                    self.min_players
                ),
            })
        };
        transition(self, vec![event])
    }
}

impl AggregateRoot for Matchmaking {
    const AGGREGATE_TYPE: &'static str = "matchmaking";
    type Payload = MatchmakingEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn evolve(state: Option<Self>, payload: &Self::Payload) -> Result<Self, DomainError> {
        match (state, payload) {
            (None, MatchmakingEvent::MatchmakingCreated(event)) => Ok(Self {
                id: event.matchmaking_id,
                min_players: event.min_players,
                max_players: event.max_players,
                players: Vec::new(),
                phase: MatchmakingPhase::Open,
            }),
            (Some(mut state), MatchmakingEvent::PlayerJoined(event)) => {
                state.players.push(event.player_id);
                Ok(state)
            }
            (Some(mut state), MatchmakingEvent::PlayerLeft(event)) => {
                state.players.retain(|p| *p != event.player_id);
                Ok(state)
            }
            (Some(state), MatchmakingEvent::MatchmakingEnded(event)) => Ok(Self {
                players: event.players.clone(),
                phase: MatchmakingPhase::Ended,
                ..state
            }),
            (Some(state), MatchmakingEvent::MatchmakingFailed(_)) => Ok(Self {
                phase: MatchmakingPhase::Failed,
                ..state
            }),
            (_, other) => Err(unexpected_payload(Self::AGGREGATE_TYPE, other.event_type())),
        }
    }
}
