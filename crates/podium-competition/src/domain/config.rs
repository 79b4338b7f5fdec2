//! Competition configuration carried in the creation event.

use std::collections::HashSet;

use podium_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scoring::HillProfile;

/// How many participants of a round carry into the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count")]
pub enum RoundParticipantsLimit {
    /// Everybody advances.
    None,
    /// At least `n` advance; ties at the cut extend it.
    Soft(u32),
    /// Exactly `n` advance; ties at the cut are broken.
    Exact(u32),
}

/// Per-round settings. `limit` decides who carries from this round into
/// the next; it is ignored for the last round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Advancement limit applied when this round ends.
    pub limit: RoundParticipantsLimit,
}

/// How ties straddling an `Exact` cut are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreakPolicy {
    /// Every tied entry advances, even past the limit.
    KeepAll,
    /// Lowest bib wins.
    LowestBib,
    /// Best score in the round just ended wins; bib breaks what remains.
    BestLastRound,
    /// Uniform draw from the engine's seeded generator.
    SeededDraw,
}

/// Whether the next round opens as soon as a round ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextRoundPolicy {
    /// Open the next round immediately.
    AlwaysContinue,
    /// Wait for an explicit start.
    AlwaysWait,
    /// Open immediately only while at least this many rounds remain after
    /// the one just ended.
    ContinueIfRoundsRemain(u32),
}

/// A competitor entered in a competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Competitor {
    /// Competitor identifier.
    pub id: Uuid,
    /// Start number; the deterministic secondary key for ties.
    pub bib: u32,
}

/// Complete configuration of one competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionConfig {
    /// Rounds in order.
    pub rounds: Vec<RoundConfig>,
    /// Tie-break at an exact cut.
    pub tie_break: TieBreakPolicy,
    /// Next-round start policy.
    pub next_round: NextRoundPolicy,
    /// Hill used for scoring and simulation.
    pub hill: HillProfile,
}

impl CompetitionConfig {
    /// A single round in which everybody jumps once.
    #[must_use]
    pub fn single_round() -> Self {
        Self {
            rounds: vec![RoundConfig {
                limit: RoundParticipantsLimit::None,
            }],
            tie_break: TieBreakPolicy::LowestBib,
            next_round: NextRoundPolicy::AlwaysContinue,
            hill: HillProfile::default(),
        }
    }

    /// The classic two-round format: the best `finalists` carry into the
    /// final round.
    #[must_use]
    pub fn two_rounds(finalists: u32) -> Self {
        Self {
            rounds: vec![
                RoundConfig {
                    limit: RoundParticipantsLimit::Soft(finalists),
                },
                RoundConfig {
                    limit: RoundParticipantsLimit::None,
                },
            ],
            tie_break: TieBreakPolicy::LowestBib,
            next_round: NextRoundPolicy::AlwaysWait,
            hill: HillProfile::default(),
        }
    }

    /// Number of configured rounds.
    #[must_use]
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Checks the configuration against the entry list.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty round list, an empty or
    /// duplicated entry list, or a zero limit.
    pub fn validate(&self, competitors: &[Competitor]) -> Result<(), DomainError> {
        if self.rounds.is_empty() {
            return Err(DomainError::Validation(
                "a competition needs at least one round".to_owned(),
            ));
        }
        if competitors.is_empty() {
            return Err(DomainError::Validation(
                "a competition needs at least one competitor".to_owned(),
            ));
        }
        let mut seen = HashSet::with_capacity(competitors.len());
        if !competitors.iter().all(|c| seen.insert(c.id)) {
            return Err(DomainError::Validation(
                "competitor ids must be unique".to_owned(),
            ));
        }
        let zero_limit = self.rounds.iter().any(|round| {
            matches!(
                round.limit,
                RoundParticipantsLimit::Soft(0) | RoundParticipantsLimit::Exact(0)
            )
        });
        if zero_limit {
            return Err(DomainError::Validation(
                "round limits must admit at least one participant".to_owned(),
            ));
        }
        Ok(())
    }
}
