//! Aggregate root for the draft context.

use std::collections::HashSet;

use podium_core::aggregate::{AggregateRoot, create, transition, unexpected_payload};
use podium_core::error::DomainError;
use podium_core::event::EventPayload;
use podium_core::rng::{SeededRng, WeightedPool, derive_seed};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    DraftCandidate, DraftCreated, DraftEnded, DraftEvent, NextPick, Pick, PickMade,
};

/// Draft phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftPhase {
    /// Picks are being made.
    Picking,
    /// Every pick has been made.
    Ended,
}

/// The aggregate root for a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Players in first-round order.
    pub players: Vec<Uuid>,
    /// Candidate pool with auto-pick weights.
    pub candidates: Vec<DraftCandidate>,
    /// Picks each player makes.
    pub picks_per_player: u32,
    /// Seed for auto-picks.
    pub seed: u64,
    /// Picks made so far, in order.
    pub picks: Vec<Pick>,
    /// Current phase.
    pub phase: DraftPhase,
}

/// Outcome of a draft operation.
pub type Decision = (Draft, Vec<DraftEvent>);

/// Returns the player holding overall pick `pick_index` in snake order:
/// even rounds run through `players` forwards, odd rounds backwards.
#[must_use]
pub fn snake_picker(players: &[Uuid], pick_index: u32) -> Option<Uuid> {
    if players.is_empty() {
        return None;
    }
    let count = players.len();
    let index = pick_index as usize;
    let round = index / count;
    let position = index % count;
    let seat = if round % 2 == 0 {
        position
    } else {
        count - 1 - position
    };
    players.get(seat).copied()
}

impl Draft {
    /// Opens a draft.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when there are no players, a player
    /// or candidate is listed twice, `picks_per_player` is zero, a weight is
    /// negative or not finite, or the pool cannot cover every pick.
    pub fn create(
        id: Uuid,
        players: Vec<Uuid>,
        candidates: Vec<DraftCandidate>,
        picks_per_player: u32,
        seed: u64,
    ) -> Result<Decision, DomainError> {
        if players.is_empty() {
            return Err(DomainError::Validation("a draft needs players".to_owned()));
        }
        if picks_per_player == 0 {
            return Err(DomainError::Validation(
                "picks per player must be positive".to_owned(),
            ));
        }
        let unique_players: HashSet<Uuid> = players.iter().copied().collect();
        if unique_players.len() != players.len() {
            return Err(DomainError::Validation("duplicate player in draft".to_owned()));
        }
        let unique_candidates: HashSet<Uuid> =
            candidates.iter().map(|c| c.competitor_id).collect();
        if unique_candidates.len() != candidates.len() {
            return Err(DomainError::Validation(
                "duplicate candidate in draft".to_owned(),
            ));
        }
        if candidates
            .iter()
            .any(|c| !c.weight.is_finite() || c.weight < 0.0)
        {
            return Err(DomainError::Validation(
                "candidate weights must be finite and non-negative".to_owned(),
            ));
        }
        let total_picks = players.len() * picks_per_player as usize;
        if candidates.len() < total_picks {
            return Err(DomainError::Validation(format!(
                "{} candidates cannot cover {total_picks} picks",
                candidates.len()
            )));
        }
        let next_pick = NextPick {
            pick_index: 0,
            player_id: players[0],
        };
        create::<Self>(vec![DraftEvent::DraftCreated(DraftCreated {
            draft_id: id,
            players,
            candidates,
            picks_per_player,
            seed,
            next_pick,
        })])
    }

    /// Total number of picks in the draft.
    #[must_use]
    pub fn total_picks(&self) -> u32 {
        u32::try_from(self.players.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.picks_per_player)
    }

    /// The pick that is up next, if the draft is still running.
    #[must_use]
    pub fn next_pick(&self) -> Option<NextPick> {
        if self.phase != DraftPhase::Picking {
            return None;
        }
        let pick_index = u32::try_from(self.picks.len()).ok()?;
        snake_picker(&self.players, pick_index).map(|player_id| NextPick {
            pick_index,
            player_id,
        })
    }

    /// Candidates nobody has picked yet, in pool order.
    #[must_use]
    pub fn available(&self) -> Vec<DraftCandidate> {
        let taken: HashSet<Uuid> = self.picks.iter().map(|p| p.competitor_id).collect();
        self.candidates
            .iter()
            .filter(|c| !taken.contains(&c.competitor_id))
            .copied()
            .collect()
    }

    /// Competitors picked by `player_id`, in pick order.
    #[must_use]
    pub fn picks_of(&self, player_id: Uuid) -> Vec<Uuid> {
        self.picks
            .iter()
            .filter(|p| p.player_id == player_id)
            .map(|p| p.competitor_id)
            .collect()
    }

    fn current(&self) -> Result<NextPick, DomainError> {
        self.next_pick().ok_or_else(|| {
            DomainError::InvalidPhase(format!("draft {} has ended", self.id))
        })
    }

    fn apply_pick(&self, pick: Pick) -> Result<Decision, DomainError> {
        let mut picks = self.picks.clone();
        picks.push(pick);
        let next_pick = if picks.len() >= self.total_picks() as usize {
            None
        } else {
            let pick_index = pick.pick_index + 1;
            snake_picker(&self.players, pick_index).map(|player_id| NextPick {
                pick_index,
                player_id,
            })
        };
        let mut events = vec![DraftEvent::PickMade(PickMade { pick, next_pick })];
        if next_pick.is_none() {
            events.push(DraftEvent::DraftEnded(DraftEnded {
                draft_id: self.id,
                picks,
            }));
        }
        transition(self, events)
    }

    /// Records a player's own pick.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` once the draft has ended and
    /// `DomainError::PolicyViolation` when it is not the player's turn or the
    /// competitor is not available.
    pub fn make_pick(&self, player_id: Uuid, competitor_id: Uuid) -> Result<Decision, DomainError> {
        let next = self.current()?;
        if next.player_id != player_id {
            return Err(DomainError::PolicyViolation(format!(
                "pick {} belongs to player {}, not {player_id}",
                next.pick_index, next.player_id
            )));
        }
        if !self
            .available()
            .iter()
            .any(|c| c.competitor_id == competitor_id)
        {
            return Err(DomainError::PolicyViolation(format!(
                "competitor {competitor_id} is not available"
            )));
        }
        self.apply_pick(Pick {
            pick_index: next.pick_index,
            player_id,
            competitor_id,
            auto: false,
        })
    }

    /// Makes pick `pick_index` for the player on the clock by a weighted draw
    /// over the remaining candidates. The draw is seeded from the draft seed
    /// and the pick index, so replays pick the same competitor.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` when `pick_index` is not the pick
    /// that is up next and `DomainError::PolicyViolation` when every
    /// remaining candidate has zero weight.
    pub fn auto_pick(&self, pick_index: u32) -> Result<Decision, DomainError> {
        let next = self.current()?;
        if next.pick_index != pick_index {
            return Err(DomainError::InvalidPhase(format!(
                "pick {pick_index} is not on the clock, pick {} is",
                next.pick_index
            )));
        }
        let mut pool = WeightedPool::new();
        for candidate in self.available() {
            pool.push(candidate.competitor_id, candidate.weight);
        }
        let mut rng = SeededRng::new(derive_seed(&[
            self.seed.to_le_bytes().as_slice(),
            pick_index.to_le_bytes().as_slice(),
        ]));
        let competitor_id = pool.draw(&mut rng)?;
        self.apply_pick(Pick {
            pick_index,
            player_id: next.player_id,
            competitor_id,
            auto: true,
        })
    }
}

impl AggregateRoot for Draft {
    const AGGREGATE_TYPE: &'static str = "draft";
    type Payload = DraftEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn evolve(state: Option<Self>, payload: &Self::Payload) -> Result<Self, DomainError> {
        match (state, payload) {
            (None, DraftEvent::DraftCreated(event)) => Ok(Self {
                id: event.draft_id,
                players: event.players.clone(),
                candidates: event.candidates.clone(),
                picks_per_player: event.picks_per_player,
                seed: event.seed,
                picks: Vec::new(),
                phase: DraftPhase::Picking,
            }),
            (Some(mut state), DraftEvent::PickMade(event)) => {
                state.picks.push(event.pick);
                Ok(state)
            }
            (Some(state), DraftEvent::DraftEnded(_)) => Ok(Self {
                phase: DraftPhase::Ended,
                ..state
            }),
            (_, other) => Err(unexpected_payload(Self::AGGREGATE_TYPE, other.event_type())),
        }
    }
}
