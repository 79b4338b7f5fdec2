//! Session settlement: placements become points, points become a ranking.

use std::collections::HashMap;

use podium_competition::domain::results::{ClassificationResult, dense_ranks};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::DraftedCompetitor;

/// Points for places 1 to 30 of the World Cup table.
pub const WORLD_CUP_POINTS: [u32; 30] = [
    100, 80, 60, 50, 45, 40, 36, 32, 29, 26, 24, 22, 20, 18, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7,
    6, 5, 4, 3, 2, 1,
];

/// Placement to points curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "points")]
pub enum PointsTable {
    /// The World Cup curve; places beyond 30 score nothing.
    #[default]
    WorldCup,
    /// `top` points for the winner, one less per place, down to one.
    Linear {
        /// Points for first place.
        top: u32,
    },
    /// Explicit points per place, first place first.
    Custom(Vec<u32>),
}

impl PointsTable {
    /// Points awarded for `rank` (1-based). Rank 0 scores nothing.
    #[must_use]
    pub fn points_for(&self, rank: u32) -> u32 {
        let Some(index) = rank.checked_sub(1) else {
            return 0;
        };
        match self {
            Self::WorldCup => WORLD_CUP_POINTS.get(index as usize).copied().unwrap_or(0),
            Self::Linear { top } => top.saturating_sub(index),
            Self::Custom(points) => points.get(index as usize).copied().unwrap_or(0),
        }
    }
}

/// Points one drafted competitor earned for a player in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorScore {
    /// The competitor.
    pub competitor_id: Uuid,
    /// Placement in the stage, if the competitor was classified.
    pub placement: Option<u32>,
    /// Points earned.
    pub points: u32,
}

/// One line of the session ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStanding {
    /// Dense rank: ties share a rank, the next rank skips by the tie size.
    pub rank: u32,
    /// The player.
    pub player_id: Uuid,
    /// Total points.
    pub points: u32,
    /// Breakdown per drafted competitor and stage.
    pub scores: Vec<CompetitorScore>,
}

/// Builds the session ranking from the scoring stages' classifications.
///
/// Each player sums the table points of the placements of the competitors
/// they drafted. Players are ordered by points, ties in seating order, so
/// the ranking is fully determined by its inputs.
#[must_use]
pub fn rank_players(
    players: &[Uuid],
    picks: &[DraftedCompetitor],
    stages: &[Vec<ClassificationResult>],
    table: &PointsTable,
) -> Vec<PlayerStanding> {
    let placements: Vec<HashMap<Uuid, u32>> = stages
        .iter()
        .map(|results| results.iter().map(|r| (r.competitor_id, r.rank)).collect())
        .collect();

    let mut standings: Vec<PlayerStanding> = players
        .iter()
        .map(|&player_id| {
            let scores: Vec<CompetitorScore> = picks
                .iter()
                .filter(|pick| pick.player_id == player_id)
                .flat_map(|pick| {
                    placements.iter().map(move |stage| {
                        let placement = stage.get(&pick.competitor_id).copied();
                        CompetitorScore {
                            competitor_id: pick.competitor_id,
                            placement,
                            points: placement.map_or(0, |rank| table.points_for(rank)),
                        }
                    })
                })
                .collect();
            PlayerStanding {
                rank: 0,
                player_id,
                points: scores.iter().fold(0, |sum: u32, s| sum.saturating_add(s.points)),
                scores,
            }
        })
        .collect();

    // Stable: equal totals keep seating order.
    standings.sort_by(|a, b| b.points.cmp(&a.points));

    let ranks = dense_ranks(standings.iter().map(|standing| standing.points));
    for (standing, rank) in standings.iter_mut().zip(ranks) {
        standing.rank = rank;
    }
    standings
}
