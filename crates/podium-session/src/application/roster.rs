//! Source of the competitor field for new sessions.

use podium_competition::domain::config::Competitor;
use uuid::Uuid;

/// Supplies the competitor field a new session is created with.
pub trait CompetitorRoster: Send + Sync {
    /// Competitors for a session of `player_count` players.
    fn competitors(&self, player_count: usize) -> Vec<Competitor>;
}

/// A fixed field, handed out unchanged to every session.
#[derive(Debug, Clone)]
pub struct StaticCompetitorRoster {
    competitors: Vec<Competitor>,
}

impl StaticCompetitorRoster {
    /// A roster of the given competitors.
    #[must_use]
    pub fn new(competitors: Vec<Competitor>) -> Self {
        Self { competitors }
    }

    /// A roster of `count` fresh competitors with bibs `1..=count`.
    #[must_use]
    pub fn generated(count: u32) -> Self {
        Self::new(
            (1..=count)
                .map(|bib| Competitor {
                    id: Uuid::new_v4(),
                    bib,
                })
                .collect(),
        )
    }
}

impl CompetitorRoster for StaticCompetitorRoster {
    fn competitors(&self, _player_count: usize) -> Vec<Competitor> {
        self.competitors.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_roster_numbers_bibs_from_one() {
        let roster = StaticCompetitorRoster::generated(3);

        let bibs: Vec<u32> = roster.competitors(2).iter().map(|c| c.bib).collect();

        assert_eq!(bibs, vec![1, 2, 3]);
    }
}
