//! Session settings, carried by value in the creation event.

use std::collections::HashSet;

use podium_competition::domain::config::{CompetitionConfig, Competitor};
use podium_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phases::NextStage;
use super::ranking::PointsTable;

/// How a session is run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSessionSettings {
    /// Observation competitions before the draft, in order.
    pub pre_draft_competitions: Vec<CompetitionConfig>,
    /// The scoring competition.
    pub main_competition: CompetitionConfig,
    /// Competitors each player drafts.
    pub picks_per_player: u32,
    /// Placement to points curve for settlement.
    pub points_table: PointsTable,
}

impl Default for GameSessionSettings {
    fn default() -> Self {
        Self {
            pre_draft_competitions: vec![CompetitionConfig::single_round(); 2],
            main_competition: CompetitionConfig::two_rounds(30),
            picks_per_player: 2,
            points_table: PointsTable::WorldCup,
        }
    }
}

impl GameSessionSettings {
    /// The stage a fresh session starts with.
    #[must_use]
    pub fn first_stage(&self) -> NextStage {
        if self.pre_draft_competitions.is_empty() {
            NextStage::Draft
        } else {
            NextStage::PreDraft {
                competition_index: 0,
            }
        }
    }

    /// The stage following pre-draft competition `competition_index`.
    #[must_use]
    pub fn after_pre_draft(&self, competition_index: u32) -> NextStage {
        let next = competition_index + 1;
        if (next as usize) < self.pre_draft_competitions.len() {
            NextStage::PreDraft {
                competition_index: next,
            }
        } else {
            NextStage::Draft
        }
    }

    /// Checks the settings against the roster.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty or duplicated player
    /// list, zero picks, too few competitors to draft, or an invalid
    /// competition configuration.
    pub fn validate(&self, players: &[Uuid], competitors: &[Competitor]) -> Result<(), DomainError> {
        if players.is_empty() {
            return Err(DomainError::Validation("a session needs players".to_owned()));
        }
        let mut seen = HashSet::with_capacity(players.len());
        if !players.iter().all(|p| seen.insert(*p)) {
            return Err(DomainError::Validation("player ids must be unique".to_owned()));
        }
        if self.picks_per_player == 0 {
            return Err(DomainError::Validation(
                "picks per player must be positive".to_owned(),
            ));
        }
        let needed = players.len() * self.picks_per_player as usize;
        if competitors.len() < needed {
            return Err(DomainError::Validation(format!(
                "{} competitors cannot cover {needed} picks",
                competitors.len()
            )));
        }
        for config in &self.pre_draft_competitions {
            config.validate(competitors)?;
        }
        self.main_competition.validate(competitors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competitors(n: u32) -> Vec<Competitor> {
        (1..=n)
            .map(|bib| Competitor {
                id: Uuid::new_v4(),
                bib,
            })
            .collect()
    }

    #[test]
    fn test_stage_order_runs_pre_draft_then_draft() {
        let settings = GameSessionSettings::default();

        assert_eq!(
            settings.first_stage(),
            NextStage::PreDraft {
                competition_index: 0
            }
        );
        assert_eq!(
            settings.after_pre_draft(0),
            NextStage::PreDraft {
                competition_index: 1
            }
        );
        assert_eq!(settings.after_pre_draft(1), NextStage::Draft);
    }

    #[test]
    fn test_without_pre_draft_first_stage_is_draft() {
        let settings = GameSessionSettings {
            pre_draft_competitions: Vec::new(),
            ..GameSessionSettings::default()
        };

        assert_eq!(settings.first_stage(), NextStage::Draft);
    }

    #[test]
    fn test_validate_requires_enough_competitors() {
        let settings = GameSessionSettings::default();
        let players = vec![Uuid::new_v4(), Uuid::new_v4()];

        assert!(settings.validate(&players, &competitors(4)).is_ok());
        assert!(matches!(
            settings.validate(&players, &competitors(3)),
            Err(DomainError::Validation(_))
        ));
    }
}
