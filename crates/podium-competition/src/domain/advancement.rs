//! Advancement between rounds: the cut, the tie-breaker at the cut and the
//! decision whether the next round opens immediately.
//!
//! Every decision here is a pure function of the standings, the configured
//! policy and, for seeded draws, the engine's generator, so replaying the
//! same stream reproduces the same advancing set.

use std::ops::Range;

use podium_core::error::DomainError;
use podium_core::rng::{DeterministicRng, WeightedPool};
use uuid::Uuid;

use super::config::{NextRoundPolicy, RoundParticipantsLimit, TieBreakPolicy};
use super::results::{ClassificationResult, RoundRecord};
use super::scoring::Points;

/// A tie group straddling the cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieGroup {
    /// Positions of the tied entries in the standings.
    pub positions: Range<usize>,
    /// Slots left for the group under the limit.
    pub slots: usize,
}

/// Where the standings are cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    /// Number of leading entries that advance unconditionally.
    pub clear: usize,
    /// Tied entries competing for the remaining slots.
    pub tie: Option<TieGroup>,
}

/// A tied entry as seen by the tie-breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiedEntry {
    /// Competitor.
    pub competitor_id: Uuid,
    /// Their bib.
    pub bib: u32,
    /// Points in the round just ended.
    pub last_round_points: Points,
}

/// Resolves a tie group at an exact cut.
pub trait AdvancementTieBreaker {
    /// Picks the advancing ids among `tied`. Must be deterministic for the
    /// same inputs and generator state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PolicyViolation` if the selection cannot be
    /// made.
    fn select(
        &self,
        tied: &[TiedEntry],
        slots: usize,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Vec<Uuid>, DomainError>;
}

impl AdvancementTieBreaker for TieBreakPolicy {
    fn select(
        &self,
        tied: &[TiedEntry],
        slots: usize,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Vec<Uuid>, DomainError> {
        let mut ordered = tied.to_vec();
        match self {
            Self::KeepAll => return Ok(ordered.iter().map(|e| e.competitor_id).collect()),
            Self::LowestBib => ordered.sort_by_key(|e| (e.bib, e.competitor_id)),
            Self::BestLastRound => ordered.sort_by(|a, b| {
                b.last_round_points
                    .cmp(&a.last_round_points)
                    .then(a.bib.cmp(&b.bib))
            }),
            Self::SeededDraw => {
                ordered.sort_by_key(|e| (e.bib, e.competitor_id));
                let mut pool = WeightedPool::new();
                for entry in &ordered {
                    pool.push(entry.competitor_id, 1.0);
                }
                return pool.draw_many(slots.min(ordered.len()), rng);
            }
        }
        Ok(ordered
            .into_iter()
            .take(slots)
            .map(|e| e.competitor_id)
            .collect())
    }
}

/// Decides whether the next round opens as soon as a round ends.
pub trait NextRoundStartDecider {
    /// `ended_round` is the zero-based index of the round that just ended.
    fn start_immediately(&self, ended_round: usize, round_count: usize) -> bool;
}

impl NextRoundStartDecider for NextRoundPolicy {
    fn start_immediately(&self, ended_round: usize, round_count: usize) -> bool {
        match self {
            Self::AlwaysContinue => true,
            Self::AlwaysWait => false,
            Self::ContinueIfRoundsRemain(required) => {
                let remaining = round_count.saturating_sub(ended_round + 1);
                u32::try_from(remaining).unwrap_or(u32::MAX) >= *required
            }
        }
    }
}

/// Applies a round limit to ranked standings.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancementDecider;

impl AdvancementDecider {
    /// Computes the cut for `standings` (sorted, dense-ranked).
    #[must_use]
    pub fn cut(standings: &[ClassificationResult], limit: RoundParticipantsLimit) -> Cut {
        let everyone = Cut {
            clear: standings.len(),
            tie: None,
        };
        let (n, exact) = match limit {
            RoundParticipantsLimit::None => return everyone,
            RoundParticipantsLimit::Soft(n) => (n as usize, false),
            RoundParticipantsLimit::Exact(n) => (n as usize, true),
        };
        if n == 0 || n >= standings.len() {
            return everyone;
        }
        let rank_at_cut = standings[n - 1].rank;
        let group_end = standings
            .iter()
            .take_while(|line| line.rank <= rank_at_cut)
            .count();
        if !exact {
            return Cut {
                clear: group_end,
                tie: None,
            };
        }
        if group_end == n {
            return Cut {
                clear: n,
                tie: None,
            };
        }
        let group_start = standings
            .iter()
            .position(|line| line.rank == rank_at_cut)
            .unwrap_or(n - 1);
        Cut {
            clear: group_start,
            tie: Some(TieGroup {
                positions: group_start..group_end,
                slots: n - group_start,
            }),
        }
    }

    /// Returns the ids that carry into the next round: the clear entries in
    /// standings order, then the tie-breaker's picks.
    ///
    /// # Errors
    ///
    /// Propagates tie-breaker failures.
    pub fn advancing(
        standings: &[ClassificationResult],
        limit: RoundParticipantsLimit,
        round: &RoundRecord,
        tie_breaker: &dyn AdvancementTieBreaker,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Vec<Uuid>, DomainError> {
        let cut = Self::cut(standings, limit);
        let mut advancing: Vec<Uuid> = standings[..cut.clear]
            .iter()
            .map(|line| line.competitor_id)
            .collect();
        if let Some(group) = cut.tie {
            let tied: Vec<TiedEntry> = standings[group.positions]
                .iter()
                .map(|line| TiedEntry {
                    competitor_id: line.competitor_id,
                    bib: line.bib,
                    last_round_points: round
                        .result_of(line.competitor_id)
                        .map_or(Points::ZERO, |r| r.points),
                })
                .collect();
            advancing.extend(tie_breaker.select(&tied, group.slots, rng)?);
        }
        Ok(advancing)
    }
}

#[cfg(test)]
mod tests {
    use podium_core::rng::SeededRng;
    use podium_test_support::{MockRng, SequenceRng};

    use super::*;
    use crate::domain::results::assign_ranks;

    fn standings(scores: &[(u32, i64)]) -> Vec<ClassificationResult> {
        let mut lines: Vec<ClassificationResult> = scores
            .iter()
            .map(|(bib, whole)| ClassificationResult {
                rank: 0,
                competitor_id: Uuid::from_u128(u128::from(*bib)),
                bib: *bib,
                rounds: Vec::new(),
                total: Points::from_whole(*whole),
            })
            .collect();
        assign_ranks(&mut lines);
        lines
    }

    fn empty_round() -> RoundRecord {
        RoundRecord::new(0)
    }

    #[test]
    fn test_exact_two_with_scores_100_100_90_admits_exactly_two() {
        // Arrange
        let table = standings(&[(1, 100), (2, 100), (3, 90)]);

        // Act
        let advancing = AdvancementDecider::advancing(
            &table,
            RoundParticipantsLimit::Exact(2),
            &empty_round(),
            &TieBreakPolicy::LowestBib,
            &mut MockRng,
        )
        .unwrap();

        // Assert
        let ranks: Vec<u32> = table.iter().map(|l| l.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3]);
        assert_eq!(advancing, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
    }

    #[test]
    fn test_exact_cut_through_tie_group_uses_lowest_bib() {
        let table = standings(&[(4, 100), (2, 100), (9, 100), (5, 90)]);

        let cut = AdvancementDecider::cut(&table, RoundParticipantsLimit::Exact(2));
        let advancing = AdvancementDecider::advancing(
            &table,
            RoundParticipantsLimit::Exact(2),
            &empty_round(),
            &TieBreakPolicy::LowestBib,
            &mut MockRng,
        )
        .unwrap();

        assert_eq!(cut.clear, 0);
        assert_eq!(
            cut.tie,
            Some(TieGroup {
                positions: 0..3,
                slots: 2
            })
        );
        assert_eq!(advancing, vec![Uuid::from_u128(2), Uuid::from_u128(4)]);
    }

    #[test]
    fn test_soft_limit_extends_cut_over_ties() {
        let table = standings(&[(1, 120), (2, 100), (3, 100), (4, 80)]);

        let cut = AdvancementDecider::cut(&table, RoundParticipantsLimit::Soft(2));

        assert_eq!(cut.clear, 3);
        assert!(cut.tie.is_none());
    }

    #[test]
    fn test_keep_all_admits_whole_tie_group_under_exact_limit() {
        let table = standings(&[(1, 120), (2, 100), (3, 100), (4, 80)]);

        let advancing = AdvancementDecider::advancing(
            &table,
            RoundParticipantsLimit::Exact(2),
            &empty_round(),
            &TieBreakPolicy::KeepAll,
            &mut MockRng,
        )
        .unwrap();

        assert_eq!(advancing.len(), 3);
    }

    #[test]
    fn test_best_last_round_prefers_stronger_recent_jump() {
        let tied = [
            TiedEntry {
                competitor_id: Uuid::from_u128(1),
                bib: 1,
                last_round_points: Points::from_whole(50),
            },
            TiedEntry {
                competitor_id: Uuid::from_u128(2),
                bib: 2,
                last_round_points: Points::from_whole(60),
            },
        ];

        let picked = TieBreakPolicy::BestLastRound
            .select(&tied, 1, &mut MockRng)
            .unwrap();

        assert_eq!(picked, vec![Uuid::from_u128(2)]);
    }

    #[test]
    fn test_seeded_draw_is_reproducible_and_driven_by_rng() {
        let tied: Vec<TiedEntry> = (1..=4)
            .map(|bib| TiedEntry {
                competitor_id: Uuid::from_u128(bib),
                bib: u32::try_from(bib).unwrap(),
                last_round_points: Points::ZERO,
            })
            .collect();

        let first = TieBreakPolicy::SeededDraw
            .select(&tied, 2, &mut SeededRng::new(42))
            .unwrap();
        let second = TieBreakPolicy::SeededDraw
            .select(&tied, 2, &mut SeededRng::new(42))
            .unwrap();
        let scripted = TieBreakPolicy::SeededDraw
            .select(&tied, 1, &mut SequenceRng::with_fractions(vec![0.99]))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(scripted, vec![Uuid::from_u128(4)]);
    }

    #[test]
    fn test_next_round_policies() {
        assert!(NextRoundPolicy::AlwaysContinue.start_immediately(0, 2));
        assert!(!NextRoundPolicy::AlwaysWait.start_immediately(0, 2));
        assert!(NextRoundPolicy::ContinueIfRoundsRemain(2).start_immediately(0, 3));
        assert!(!NextRoundPolicy::ContinueIfRoundsRemain(2).start_immediately(1, 3));
    }
}
