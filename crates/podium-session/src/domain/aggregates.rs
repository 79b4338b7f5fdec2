//! Aggregate root for the session context.

use podium_competition::domain::config::Competitor;
use podium_competition::domain::results::ClassificationResult;
use podium_core::aggregate::{AggregateRoot, create, transition, unexpected_payload};
use podium_core::error::DomainError;
use podium_core::event::EventPayload;
use podium_core::rng::derive_seed;
use podium_draft::domain::events::DraftCandidate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    CompetitionStageCompleted, CompetitionStageStarted, DraftCompleted, DraftStageStarted,
    DraftedCompetitor, GameSessionCreated, GameSessionEnded, GameSessionEvent,
};
use super::phases::{CompetitionStage, NextStage, SessionPhase};
use super::ranking::{PlayerStanding, rank_players};
use super::settings::GameSessionSettings;

/// What ran a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageKind {
    /// A competition.
    Competition(CompetitionStage),
    /// The draft.
    Draft,
}

/// One started stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Ordinal within the session, starting at 0.
    pub stage_ordinal: u32,
    /// What ran it.
    pub kind: StageKind,
    /// The competition or draft id.
    pub child_id: Uuid,
    /// Whether it has completed.
    pub completed: bool,
}

/// The aggregate root for a game session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    /// Aggregate identifier.
    pub id: Uuid,
    /// How the session runs.
    pub settings: GameSessionSettings,
    /// Players in seating order.
    pub players: Vec<Uuid>,
    /// The competitor field.
    pub competitors: Vec<Competitor>,
    /// Current phase.
    pub phase: SessionPhase,
    /// Every started stage in order.
    pub stages: Vec<StageRecord>,
    /// Draft picks, once the draft has completed.
    pub picks: Vec<DraftedCompetitor>,
    /// Settlement, once ended.
    pub ranking: Option<Vec<PlayerStanding>>,
}

/// Outcome of a session operation.
pub type Decision = (GameSession, Vec<GameSessionEvent>);

/// Weights the draft pool by pre-draft form: every classification adds
/// `field size + 1 - rank`, on top of a base weight of one so that
/// unclassified competitors can still be drawn.
#[must_use]
pub fn draft_candidates(
    competitors: &[Competitor],
    pre_draft: &[Vec<ClassificationResult>],
) -> Vec<DraftCandidate> {
    competitors
        .iter()
        .map(|competitor| {
            let form: u32 = pre_draft
                .iter()
                .filter_map(|results| {
                    let field = u32::try_from(results.len()).unwrap_or(u32::MAX);
                    results
                        .iter()
                        .find(|r| r.competitor_id == competitor.id)
                        .map(|r| (field + 1).saturating_sub(r.rank))
                })
                .sum();
            DraftCandidate {
                competitor_id: competitor.id,
                weight: 1.0 + f64::from(form),
            }
        })
        .collect()
}

impl GameSession {
    /// Creates a session waiting for its first stage.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the settings do not fit the
    /// roster.
    pub fn create(
        id: Uuid,
        settings: GameSessionSettings,
        players: Vec<Uuid>,
        competitors: Vec<Competitor>,
    ) -> Result<Decision, DomainError> {
        settings.validate(&players, &competitors)?;
        let first_stage = settings.first_stage();
        create::<Self>(vec![GameSessionEvent::GameSessionCreated(
            GameSessionCreated {
                session_id: id,
                settings,
                players,
                competitors,
                first_stage,
            },
        )])
    }

    /// Ordinal the next started stage receives.
    #[must_use]
    pub fn next_ordinal(&self) -> u32 {
        u32::try_from(self.stages.len()).unwrap_or(u32::MAX)
    }

    /// The stage in progress, if any.
    #[must_use]
    pub fn current_stage(&self) -> Option<&StageRecord> {
        self.stages.last().filter(|stage| !stage.completed)
    }

    /// Completed stages of the given kind, in order.
    #[must_use]
    pub fn completed_stages(&self, predicate: impl Fn(&StageKind) -> bool) -> Vec<StageRecord> {
        self.stages
            .iter()
            .filter(|stage| stage.completed && predicate(&stage.kind))
            .copied()
            .collect()
    }

    /// Completed observation competitions.
    #[must_use]
    pub fn completed_pre_draft(&self) -> Vec<StageRecord> {
        self.completed_stages(|kind| {
            matches!(kind, StageKind::Competition(CompetitionStage::PreDraft { .. }))
        })
    }

    /// Completed scoring competitions.
    #[must_use]
    pub fn completed_scoring(&self) -> Vec<StageRecord> {
        self.completed_stages(|kind| matches!(kind, StageKind::Competition(CompetitionStage::Main)))
    }

    fn stage_seed(&self, stage_ordinal: u32) -> u64 {
        derive_seed(&[
            self.id.as_bytes().as_slice(),
            stage_ordinal.to_le_bytes().as_slice(),
        ])
    }

    fn pending(&self) -> Result<NextStage, DomainError> {
        self.phase.pending_stage().ok_or_else(|| {
            DomainError::InvalidPhase(format!(
                "session {} is in {}, not in a break",
                self.id, self.phase
            ))
        })
    }

    /// Starts the stage waiting behind the current break. `child_id`
    /// identifies the competition or draft to run it; `pre_draft` holds the
    /// archived observation classifications and is only read for the draft.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` outside a break or when the next
    /// stage is settlement.
    pub fn start_next_stage(
        &self,
        child_id: Uuid,
        pre_draft: &[Vec<ClassificationResult>],
    ) -> Result<Decision, DomainError> {
        let stage_ordinal = self.next_ordinal();
        let seed = self.stage_seed(stage_ordinal);
        let event = match self.pending()? {
            NextStage::PreDraft { competition_index } => {
                let config = self
                    .settings
                    .pre_draft_competitions
                    .get(competition_index as usize)
                    .cloned()
                    .ok_or_else(|| {
                        DomainError::PolicyViolation(format!(
                            "no pre-draft competition {competition_index}"
                        ))
                    })?;
                GameSessionEvent::CompetitionStageStarted(CompetitionStageStarted {
                    stage: CompetitionStage::PreDraft { competition_index },
                    stage_ordinal,
                    competition_id: child_id,
                    config,
                    competitors: self.competitors.clone(),
                    seed,
                })
            }
            NextStage::Draft => GameSessionEvent::DraftStageStarted(DraftStageStarted {
                stage_ordinal,
                draft_id: child_id,
                players: self.players.clone(),
                candidates: draft_candidates(&self.competitors, pre_draft),
                picks_per_player: self.settings.picks_per_player,
                seed,
            }),
            NextStage::MainCompetition => {
                GameSessionEvent::CompetitionStageStarted(CompetitionStageStarted {
                    stage: CompetitionStage::Main,
                    stage_ordinal,
                    competition_id: child_id,
                    config: self.settings.main_competition.clone(),
                    competitors: self.competitors.clone(),
                    seed,
                })
            }
            NextStage::Ended => {
                return Err(DomainError::InvalidPhase(format!(
                    "session {} is waiting to end, not to start a stage",
                    self.id
                )));
            }
        };
        transition(self, vec![event])
    }

    /// Completes the running competition stage and opens the break before
    /// the next one. Results are archived by the caller beforehand.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` unless `competition_id` runs the
    /// stage in progress.
    pub fn complete_competition_stage(&self, competition_id: Uuid) -> Result<Decision, DomainError> {
        let Some(StageRecord {
            stage_ordinal,
            kind: StageKind::Competition(stage),
            child_id,
            ..
        }) = self.current_stage().copied()
        else {
            return Err(DomainError::InvalidPhase(format!(
                "session {} has no competition stage running",
                self.id
            )));
        };
        if child_id != competition_id {
            return Err(DomainError::InvalidPhase(format!(
                "competition {competition_id} does not run stage {stage_ordinal}"
            )));
        }
        let next = match stage {
            CompetitionStage::PreDraft { competition_index } => {
                self.settings.after_pre_draft(competition_index)
            }
            CompetitionStage::Main => NextStage::Ended,
        };
        transition(
            self,
            vec![GameSessionEvent::CompetitionStageCompleted(
                CompetitionStageCompleted {
                    stage_ordinal,
                    competition_id,
                    next,
                },
            )],
        )
    }

    /// Records the draft picks and opens the break before the main
    /// competition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` unless `draft_id` runs the draft in
    /// progress.
    pub fn complete_draft(
        &self,
        draft_id: Uuid,
        picks: Vec<DraftedCompetitor>,
    ) -> Result<Decision, DomainError> {
        let running = self
            .current_stage()
            .is_some_and(|stage| stage.kind == StageKind::Draft && stage.child_id == draft_id);
        if !running {
            return Err(DomainError::InvalidPhase(format!(
                "draft {draft_id} is not running in session {}",
                self.id
            )));
        }
        transition(
            self,
            vec![GameSessionEvent::DraftCompleted(DraftCompleted {
                draft_id,
                picks,
                next: NextStage::MainCompetition,
            })],
        )
    }

    /// Settles the session from the archived scoring classifications.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` unless the session waits to end.
    pub fn end(&self, scoring: &[Vec<ClassificationResult>]) -> Result<Decision, DomainError> {
        if self.pending()? != NextStage::Ended {
            return Err(DomainError::InvalidPhase(format!(
                "session {} has stages left",
                self.id
            )));
        }
        let ranking = rank_players(
            &self.players,
            &self.picks,
            scoring,
            &self.settings.points_table,
        );
        transition(
            self,
            vec![GameSessionEvent::GameSessionEnded(GameSessionEnded {
                session_id: self.id,
                ranking,
            })],
        )
    }

    fn complete_stage(mut self, child_id: Uuid, next: NextStage) -> Self {
        if let Some(stage) = self
            .stages
            .iter_mut()
            .rev()
            .find(|stage| stage.child_id == child_id)
        {
            stage.completed = true;
        }
        self.phase = SessionPhase::Break { next };
        self
    }
}

impl AggregateRoot for GameSession {
    const AGGREGATE_TYPE: &'static str = "game_session";
    type Payload = GameSessionEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn evolve(state: Option<Self>, payload: &Self::Payload) -> Result<Self, DomainError> {
        match (state, payload) {
            (None, GameSessionEvent::GameSessionCreated(event)) => Ok(Self {
                id: event.session_id,
                settings: event.settings.clone(),
                players: event.players.clone(),
                competitors: event.competitors.clone(),
                phase: SessionPhase::Break {
                    next: event.first_stage,
                },
                stages: Vec::new(),
                picks: Vec::new(),
                ranking: None,
            }),
            (Some(mut state), GameSessionEvent::CompetitionStageStarted(event)) => {
                state.stages.push(StageRecord {
                    stage_ordinal: event.stage_ordinal,
                    kind: StageKind::Competition(event.stage),
                    child_id: event.competition_id,
                    completed: false,
                });
                state.phase = match event.stage {
                    CompetitionStage::PreDraft { competition_index } => {
                        SessionPhase::PreDraft { competition_index }
                    }
                    CompetitionStage::Main => SessionPhase::MainCompetition,
                };
                Ok(state)
            }
            (Some(mut state), GameSessionEvent::DraftStageStarted(event)) => {
                state.stages.push(StageRecord {
                    stage_ordinal: event.stage_ordinal,
                    kind: StageKind::Draft,
                    child_id: event.draft_id,
                    completed: false,
                });
                state.phase = SessionPhase::Draft;
                Ok(state)
            }
            (Some(state), GameSessionEvent::CompetitionStageCompleted(event)) => {
                Ok(state.complete_stage(event.competition_id, event.next))
            }
            (Some(state), GameSessionEvent::DraftCompleted(event)) => {
                let mut state = state.complete_stage(event.draft_id, event.next);
                state.picks.clone_from(&event.picks);
                Ok(state)
            }
            (Some(state), GameSessionEvent::GameSessionEnded(event)) => Ok(Self {
                phase: SessionPhase::Ended,
                ranking: Some(event.ranking.clone()),
                ..state
            }),
            (_, other) => Err(unexpected_payload(Self::AGGREGATE_TYPE, other.event_type())),
        }
    }
}

#[cfg(test)]
mod tests {
    use podium_competition::domain::config::CompetitionConfig;
    use podium_competition::domain::scoring::Points;

    use super::*;
    use crate::domain::ranking::PointsTable;

    fn competitors(n: u32) -> Vec<Competitor> {
        (1..=n)
            .map(|bib| Competitor {
                id: Uuid::new_v4(),
                bib,
            })
            .collect()
    }

    fn settings() -> GameSessionSettings {
        GameSessionSettings {
            pre_draft_competitions: vec![CompetitionConfig::single_round()],
            main_competition: CompetitionConfig::single_round(),
            picks_per_player: 1,
            points_table: PointsTable::WorldCup,
        }
    }

    fn session() -> GameSession {
        let players = vec![Uuid::new_v4(), Uuid::new_v4()];
        GameSession::create(Uuid::new_v4(), settings(), players, competitors(3))
            .unwrap()
            .0
    }

    fn classification(competitors: &[Competitor]) -> Vec<ClassificationResult> {
        competitors
            .iter()
            .zip(1..)
            .map(|(c, rank)| ClassificationResult {
                rank,
                competitor_id: c.id,
                bib: c.bib,
                rounds: Vec::new(),
                total: Points::ZERO,
            })
            .collect()
    }

    #[test]
    fn test_create_opens_break_before_first_stage() {
        let session = session();

        assert_eq!(
            session.phase,
            SessionPhase::Break {
                next: NextStage::PreDraft {
                    competition_index: 0
                }
            }
        );
    }

    #[test]
    fn test_session_walks_the_stage_graph() {
        // Arrange
        let session = session();
        let (pre_draft_id, draft_id, main_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let field = session.competitors.clone();

        // Act
        let (session, _) = session.start_next_stage(pre_draft_id, &[]).unwrap();
        assert_eq!(session.phase, SessionPhase::PreDraft { competition_index: 0 });
        let (session, _) = session.complete_competition_stage(pre_draft_id).unwrap();
        assert_eq!(session.phase, SessionPhase::Break { next: NextStage::Draft });
        let (session, events) = session
            .start_next_stage(draft_id, &[classification(&field)])
            .unwrap();
        assert_eq!(session.phase, SessionPhase::Draft);
        let picks = vec![
            DraftedCompetitor {
                player_id: session.players[0],
                competitor_id: field[2].id,
            },
            DraftedCompetitor {
                player_id: session.players[1],
                competitor_id: field[0].id,
            },
        ];
        let (session, _) = session.complete_draft(draft_id, picks).unwrap();
        let (session, _) = session.start_next_stage(main_id, &[]).unwrap();
        assert_eq!(session.phase, SessionPhase::MainCompetition);
        let (session, _) = session.complete_competition_stage(main_id).unwrap();
        assert_eq!(session.phase, SessionPhase::Break { next: NextStage::Ended });
        let (session, _) = session.end(&[classification(&field)]).unwrap();

        // Assert
        let GameSessionEvent::DraftStageStarted(draft) = &events[0] else {
            panic!("expected draft stage to start");
        };
        assert_eq!(draft.stage_ordinal, 1);
        assert!(draft.candidates[0].weight > draft.candidates[2].weight);
        assert_eq!(session.phase, SessionPhase::Ended);
        let ranking = session.ranking.clone().unwrap();
        assert_eq!(ranking[0].player_id, session.players[1]);
        assert_eq!(ranking[0].points, 100);
        assert_eq!(ranking[1].points, 60);
        assert_eq!(session.completed_scoring().len(), 1);
        assert_eq!(session.completed_pre_draft().len(), 1);
    }

    #[test]
    fn test_start_next_stage_outside_break_is_invalid_phase() {
        let (running, _) = session().start_next_stage(Uuid::new_v4(), &[]).unwrap();

        let result = running.start_next_stage(Uuid::new_v4(), &[]);

        assert!(matches!(result, Err(DomainError::InvalidPhase(_))));
    }

    #[test]
    fn test_complete_foreign_competition_is_invalid_phase() {
        let (running, _) = session().start_next_stage(Uuid::new_v4(), &[]).unwrap();

        let result = running.complete_competition_stage(Uuid::new_v4());

        assert!(matches!(result, Err(DomainError::InvalidPhase(_))));
    }

    #[test]
    fn test_end_with_stages_left_is_invalid_phase() {
        let result = session().end(&[]);

        assert!(matches!(result, Err(DomainError::InvalidPhase(_))));
    }

    #[test]
    fn test_stage_seeds_differ_per_ordinal() {
        let session = session();

        assert_ne!(session.stage_seed(0), session.stage_seed(1));
    }

    #[test]
    fn test_draft_candidates_weight_unclassified_at_one() {
        let field = competitors(2);
        let results = classification(&field[..1]);

        let candidates = draft_candidates(&field, &[results]);

        assert!((candidates[0].weight - 2.0).abs() < f64::EPSILON);
        assert!((candidates[1].weight - 1.0).abs() < f64::EPSILON);
    }
}
