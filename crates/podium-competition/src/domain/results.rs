//! Rounds, startlists and derived classification.

use std::collections::HashMap;

use podium_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::Competitor;
use super::scoring::{Attempt, Points};

/// A scored attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpResult {
    /// Who jumped.
    pub competitor_id: Uuid,
    /// The raw attempt.
    pub attempt: Attempt,
    /// Points awarded.
    pub points: Points,
}

/// One round: at most one result per participant, in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Zero-based round index.
    pub index: usize,
    /// Recorded results.
    pub results: Vec<JumpResult>,
    /// Competitors carried into the next round, once decided.
    pub advancing: Option<Vec<Uuid>>,
}

impl RoundRecord {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            results: Vec::new(),
            advancing: None,
        }
    }

    /// The result of `competitor_id` in this round, if any.
    #[must_use]
    pub fn result_of(&self, competitor_id: Uuid) -> Option<&JumpResult> {
        self.results
            .iter()
            .find(|result| result.competitor_id == competitor_id)
    }
}

/// A startlist slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartlistEntry {
    /// Competitor on this slot.
    pub competitor_id: Uuid,
    /// Their bib.
    pub bib: u32,
    /// Whether the attempt has been registered.
    pub done: bool,
}

/// Ordered startlist of a round. Entries are only ever flipped from pending
/// to done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Startlist {
    round_index: usize,
    entries: Vec<StartlistEntry>,
}

impl Startlist {
    pub(crate) fn new(round_index: usize, order: &[Uuid], bibs: &HashMap<Uuid, u32>) -> Self {
        let entries = order
            .iter()
            .map(|id| StartlistEntry {
                competitor_id: *id,
                bib: bibs.get(id).copied().unwrap_or_default(),
                done: false,
            })
            .collect();
        Self {
            round_index,
            entries,
        }
    }

    /// Round this startlist belongs to.
    #[must_use]
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    /// All entries in jump order.
    #[must_use]
    pub fn entries(&self) -> &[StartlistEntry] {
        &self.entries
    }

    /// Competitor ids in jump order.
    #[must_use]
    pub fn order(&self) -> Vec<Uuid> {
        self.entries.iter().map(|e| e.competitor_id).collect()
    }

    /// First entry still waiting for an attempt.
    #[must_use]
    pub fn next_pending(&self) -> Option<&StartlistEntry> {
        self.entries.iter().find(|e| !e.done)
    }

    /// Number of pending entries.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.done).count()
    }

    /// Returns `true` once every entry is done.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.done)
    }

    /// Returns `true` if `competitor_id` is on the list.
    #[must_use]
    pub fn contains(&self, competitor_id: Uuid) -> bool {
        self.entries.iter().any(|e| e.competitor_id == competitor_id)
    }

    /// Returns `true` if `competitor_id` is on the list and has not jumped.
    #[must_use]
    pub fn is_pending(&self, competitor_id: Uuid) -> bool {
        self.entries
            .iter()
            .any(|e| e.competitor_id == competitor_id && !e.done)
    }

    pub(crate) fn mark_done(&mut self, competitor_id: Uuid) -> Result<(), DomainError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.competitor_id == competitor_id && !e.done)
            .ok_or_else(|| {
                DomainError::Infrastructure(format!(
                    "startlist of round {} has no pending entry for {competitor_id}",
                    self.round_index
                ))
            })?;
        entry.done = true;
        Ok(())
    }
}

/// A competitor's score in one round with the running total after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundScore {
    /// Round index.
    pub round_index: usize,
    /// Points scored in the round.
    pub points: Points,
    /// Cumulative points after the round.
    pub cumulative: Points,
}

/// One line of the derived classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Dense rank: tied totals share a rank and the next rank skips the
    /// size of the tie group.
    pub rank: u32,
    /// Competitor.
    pub competitor_id: Uuid,
    /// Their bib.
    pub bib: u32,
    /// Per-round scores with running totals.
    pub rounds: Vec<RoundScore>,
    /// Total over all rounds jumped.
    pub total: Points,
}

/// Builds the classification over `rounds` for every competitor with at
/// least one result. Sorted by total descending, then bib, then id.
pub(crate) fn classify(competitors: &[Competitor], rounds: &[RoundRecord]) -> Vec<ClassificationResult> {
    let mut lines: Vec<ClassificationResult> = competitors
        .iter()
        .filter_map(|competitor| {
            let mut cumulative = Points::ZERO;
            let scores: Vec<RoundScore> = rounds
                .iter()
                .filter_map(|round| {
                    round.result_of(competitor.id).map(|result| {
                        cumulative += result.points;
                        RoundScore {
                            round_index: round.index,
                            points: result.points,
                            cumulative,
                        }
                    })
                })
                .collect();
            if scores.is_empty() {
                return None;
            }
            Some(ClassificationResult {
                rank: 0,
                competitor_id: competitor.id,
                bib: competitor.bib,
                rounds: scores,
                total: cumulative,
            })
        })
        .collect();
    assign_ranks(&mut lines);
    lines
}

/// Sorts `lines` and assigns dense ranks in place.
pub(crate) fn assign_ranks(lines: &mut [ClassificationResult]) {
    lines.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then(a.bib.cmp(&b.bib))
            .then(a.competitor_id.cmp(&b.competitor_id))
    });
    let ranks = dense_ranks(lines.iter().map(|line| line.total));
    for (line, rank) in lines.iter_mut().zip(ranks) {
        line.rank = rank;
    }
}

/// Ranks for `keys` sorted best first. Equal neighbors share a rank and
/// the next distinct key takes its 1-based position, so `[9, 9, 7]` ranks
/// `[1, 1, 3]`.
pub fn dense_ranks<K: PartialEq>(keys: impl IntoIterator<Item = K>) -> Vec<u32> {
    let mut ranks = Vec::new();
    let mut previous: Option<(K, u32)> = None;
    for (position, key) in keys.into_iter().enumerate() {
        let rank = match &previous {
            Some((last, rank)) if *last == key => *rank,
            _ => u32::try_from(position + 1).unwrap_or(u32::MAX),
        };
        ranks.push(rank);
        previous = Some((key, rank));
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(bib: u32, tenths: i64) -> ClassificationResult {
        ClassificationResult {
            rank: 0,
            competitor_id: Uuid::new_v4(),
            bib,
            rounds: Vec::new(),
            total: Points::from_tenths(tenths),
        }
    }

    #[test]
    fn test_assign_ranks_shares_rank_and_skips_tie_group() {
        // Arrange
        let mut lines = vec![line(4, 900), line(2, 1000), line(1, 1000), line(3, 800)];

        // Act
        assign_ranks(&mut lines);

        // Assert
        let ranks: Vec<(u32, u32)> = lines.iter().map(|l| (l.bib, l.rank)).collect();
        assert_eq!(ranks, vec![(1, 1), (2, 1), (4, 3), (3, 4)]);
    }

    #[test]
    fn test_dense_ranks_handles_trailing_ties_and_empty_input() {
        assert_eq!(dense_ranks([5, 4, 4, 4]), vec![1, 2, 2, 2]);
        assert_eq!(dense_ranks([7, 7, 6, 6, 1]), vec![1, 1, 3, 3, 5]);
        assert!(dense_ranks(Vec::<u32>::new()).is_empty());
    }

    #[test]
    fn test_classify_sums_rounds_and_skips_competitors_without_results() {
        let a = Competitor {
            id: Uuid::new_v4(),
            bib: 1,
        };
        let b = Competitor {
            id: Uuid::new_v4(),
            bib: 2,
        };
        let idle = Competitor {
            id: Uuid::new_v4(),
            bib: 3,
        };
        let jump = |competitor_id, tenths| JumpResult {
            competitor_id,
            attempt: Attempt::new(120.0, vec![]),
            points: Points::from_tenths(tenths),
        };
        let rounds = vec![
            RoundRecord {
                index: 0,
                results: vec![jump(a.id, 1000), jump(b.id, 1100)],
                advancing: Some(vec![a.id, b.id]),
            },
            RoundRecord {
                index: 1,
                results: vec![jump(a.id, 1200)],
                advancing: None,
            },
        ];

        let lines = classify(&[a, b, idle], &rounds);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].competitor_id, a.id);
        assert_eq!(lines[0].total, Points::from_tenths(2200));
        assert_eq!(lines[0].rounds[1].cumulative, Points::from_tenths(2200));
        assert_eq!(lines[1].rank, 2);
    }

    #[test]
    fn test_startlist_tracks_pending_entries() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let bibs: HashMap<Uuid, u32> = ids.iter().copied().zip([7, 3]).collect();
        let mut startlist = Startlist::new(0, &ids, &bibs);

        startlist.mark_done(ids[0]).unwrap();

        assert_eq!(startlist.next_pending().map(|e| e.bib), Some(3));
        assert_eq!(startlist.pending_count(), 1);
        assert!(!startlist.is_pending(ids[0]));
        assert!(startlist.mark_done(ids[0]).is_err());
    }
}
