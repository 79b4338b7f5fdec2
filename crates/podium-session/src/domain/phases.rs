//! The session stage graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage a session moves to when its current break ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "stage")]
pub enum NextStage {
    /// An observation competition before the draft.
    PreDraft {
        /// Index into the configured pre-draft competitions.
        competition_index: u32,
    },
    /// The draft.
    Draft,
    /// The scoring competition.
    MainCompetition,
    /// Settlement.
    Ended,
}

impl NextStage {
    /// Stable tag used in scheduler idempotency keys.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::PreDraft { competition_index } => format!("pre-draft-{competition_index}"),
            Self::Draft => "draft".to_owned(),
            Self::MainCompetition => "main-competition".to_owned(),
            Self::Ended => "ended".to_owned(),
        }
    }
}

impl fmt::Display for NextStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// Competition-backed stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CompetitionStage {
    /// An observation competition.
    PreDraft {
        /// Index into the configured pre-draft competitions.
        competition_index: u32,
    },
    /// The scoring competition.
    Main,
}

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase")]
pub enum SessionPhase {
    /// An observation competition is running.
    PreDraft {
        /// Index into the configured pre-draft competitions.
        competition_index: u32,
    },
    /// The draft is running.
    Draft,
    /// The scoring competition is running.
    MainCompetition,
    /// Between stages.
    Break {
        /// Stage that starts when the break ends.
        next: NextStage,
    },
    /// Settled.
    Ended,
}

impl SessionPhase {
    /// The stage waiting behind a break, if any.
    #[must_use]
    pub fn pending_stage(&self) -> Option<NextStage> {
        match self {
            Self::Break { next } => Some(*next),
            _ => None,
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreDraft { competition_index } => write!(f, "pre-draft-{competition_index}"),
            Self::Draft => f.write_str("draft"),
            Self::MainCompetition => f.write_str("main-competition"),
            Self::Break { next } => write!(f, "break:{next}"),
            Self::Ended => f.write_str("ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_stage_tags_are_distinct() {
        let tags: Vec<String> = [
            NextStage::PreDraft { competition_index: 0 },
            NextStage::PreDraft { competition_index: 1 },
            NextStage::Draft,
            NextStage::MainCompetition,
            NextStage::Ended,
        ]
        .iter()
        .map(NextStage::tag)
        .collect();

        assert_eq!(
            tags,
            vec!["pre-draft-0", "pre-draft-1", "draft", "main-competition", "ended"]
        );
    }

    #[test]
    fn test_break_display_names_next_stage() {
        let phase = SessionPhase::Break {
            next: NextStage::Draft,
        };

        assert_eq!(phase.to_string(), "break:draft");
        assert_eq!(phase.pending_stage(), Some(NextStage::Draft));
    }
}
