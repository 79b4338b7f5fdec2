//! The Competition Round Engine.
//!
//! The engine is the state of the `GameCompetition` aggregate. Every
//! operation validates against the current state, decides the resulting
//! events and folds them into a fresh copy; applying an event never makes a
//! decision, so a replay of the stream rebuilds the exact same engine.

use std::collections::HashMap;
use std::fmt;

use podium_core::aggregate::{AggregateRoot, create, transition, unexpected_payload};
use podium_core::error::DomainError;
use podium_core::event::EventPayload;
use podium_core::rng::SeededRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::advancement::{AdvancementDecider, NextRoundStartDecider};
use super::config::{CompetitionConfig, Competitor};
use super::events::{
    CompetitionEnded, CompetitionEvent, CompetitionStarted, NextRoundStarted, ResultRegistered,
    RoundEnded,
};
use super::results::{ClassificationResult, JumpResult, RoundRecord, Startlist, classify};
use super::scoring::{Attempt, Points, RoundContext, Scorer};

/// Snapshot format written by [`CompetitionEngine::to_snapshot`].
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase")]
pub enum EnginePhase {
    /// Attempts of this round are being registered.
    Running {
        /// Zero-based round index.
        round_index: usize,
    },
    /// A round ended and the next one waits for an explicit start.
    WaitingForNextRound {
        /// Round that will open next.
        next_round_index: usize,
    },
    /// Every round is done.
    Ended,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { round_index } => write!(f, "running round {round_index}"),
            Self::WaitingForNextRound { next_round_index } => {
                write!(f, "waiting for round {next_round_index}")
            }
            Self::Ended => f.write_str("ended"),
        }
    }
}

/// Round-based competition state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionEngine {
    competition_id: Uuid,
    config: CompetitionConfig,
    competitors: Vec<Competitor>,
    rounds: Vec<RoundRecord>,
    startlist: Option<Startlist>,
    phase: EnginePhase,
    rng: SeededRng,
    version: i64,
}

/// The competition aggregate is the engine itself.
pub type GameCompetition = CompetitionEngine;

/// Outcome of an engine operation: the new engine and the events to append.
pub type Decision = (CompetitionEngine, Vec<CompetitionEvent>);

#[derive(Serialize)]
struct SnapshotOut<'a> {
    format: u32,
    engine: &'a CompetitionEngine,
}

#[derive(Deserialize)]
struct SnapshotIn {
    format: u32,
    engine: CompetitionEngine,
}

impl CompetitionEngine {
    /// Creates a competition; round 0 opens with the entry list as its
    /// startlist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the configuration or entry list
    /// is invalid.
    pub fn create(
        competition_id: Uuid,
        config: CompetitionConfig,
        competitors: Vec<Competitor>,
        seed: u64,
    ) -> Result<Decision, DomainError> {
        config.validate(&competitors)?;
        let startlist = competitors.iter().map(|c| c.id).collect();
        create::<Self>(vec![CompetitionEvent::CompetitionStarted(
            CompetitionStarted {
                competition_id,
                config,
                competitors,
                seed,
                startlist,
            },
        )])
    }

    /// Competition identifier.
    #[must_use]
    pub fn competition_id(&self) -> Uuid {
        self.competition_id
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &CompetitionConfig {
        &self.config
    }

    /// Entry list in registration order.
    #[must_use]
    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    /// Rounds opened so far.
    #[must_use]
    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Number of events folded into this engine.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Looks up a competitor by id.
    #[must_use]
    pub fn competitor(&self, competitor_id: Uuid) -> Option<Competitor> {
        self.competitors
            .iter()
            .copied()
            .find(|c| c.id == competitor_id)
    }

    /// Scores and records one attempt in the running round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` unless a round is running,
    /// `DomainError::PolicyViolation` if the competitor is not on the
    /// startlist or already has a result in this round, and scorer errors.
    pub fn register_result(
        &self,
        competitor_id: Uuid,
        attempt: Attempt,
        scorer: &dyn Scorer,
    ) -> Result<Decision, DomainError> {
        let EnginePhase::Running { round_index } = self.phase else {
            return Err(DomainError::InvalidPhase(format!(
                "cannot register a result while {}",
                self.phase
            )));
        };
        let startlist = self.generate_startlist()?;
        if !startlist.contains(competitor_id) {
            return Err(DomainError::PolicyViolation(format!(
                "{competitor_id} is not on the startlist of round {round_index}"
            )));
        }
        let already_scored = self
            .rounds
            .get(round_index)
            .is_some_and(|round| round.result_of(competitor_id).is_some());
        if already_scored || !startlist.is_pending(competitor_id) {
            return Err(DomainError::PolicyViolation(format!(
                "{competitor_id} already has a result in round {round_index}"
            )));
        }

        let points = scorer.score(&attempt, &RoundContext { round_index })?;
        let mut after = startlist;
        after.mark_done(competitor_id)?;
        let next_pending = after.next_pending().map(|e| e.competitor_id);

        transition(
            self,
            vec![CompetitionEvent::ResultRegistered(ResultRegistered {
                round_index,
                result: JumpResult {
                    competitor_id,
                    attempt,
                    points,
                },
                next_pending,
                round_complete: next_pending.is_none(),
            })],
        )
    }

    /// True iff the running round is the last configured one and nobody on
    /// its startlist is still waiting.
    #[must_use]
    pub fn should_end_competition(&self) -> bool {
        let EnginePhase::Running { round_index } = self.phase else {
            return false;
        };
        round_index + 1 == self.config.round_count()
            && self.startlist.as_ref().is_some_and(Startlist::is_complete)
    }

    /// Closes the running round. After the last round the competition ends;
    /// otherwise the advancing set is decided and the next round either
    /// opens immediately or waits, as `decider` says.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` unless a round is running and
    /// `DomainError::PolicyViolation` while attempts are pending.
    pub fn end_round(&self, decider: &dyn NextRoundStartDecider) -> Result<Decision, DomainError> {
        let EnginePhase::Running { round_index } = self.phase else {
            return Err(DomainError::InvalidPhase(format!(
                "cannot end a round while {}",
                self.phase
            )));
        };
        let pending = self.generate_startlist()?.pending_count();
        if pending > 0 {
            return Err(DomainError::PolicyViolation(format!(
                "round {round_index} still has {pending} pending attempts"
            )));
        }

        if self.should_end_competition() {
            return transition(
                self,
                vec![
                    CompetitionEvent::RoundEnded(RoundEnded {
                        round_index,
                        advancing: Vec::new(),
                        waiting_for: None,
                        rng: self.rng,
                    }),
                    CompetitionEvent::CompetitionEnded(CompetitionEnded {
                        competition_id: self.competition_id,
                        results: self.generate_results(),
                    }),
                ],
            );
        }

        let round = self.round(round_index)?;
        let standings = self.round_standings(round_index);
        let mut rng = self.rng;
        let advancing = AdvancementDecider::advancing(
            &standings,
            self.config.rounds[round_index].limit,
            round,
            &self.config.tie_break,
            &mut rng,
        )?;
        let next_round_index = round_index + 1;
        let immediate = decider.start_immediately(round_index, self.config.round_count());
        let mut events = vec![CompetitionEvent::RoundEnded(RoundEnded {
            round_index,
            advancing: advancing.clone(),
            waiting_for: (!immediate).then_some(next_round_index),
            rng,
        })];
        if immediate {
            events.push(CompetitionEvent::NextRoundStarted(NextRoundStarted {
                round_index: next_round_index,
                startlist: self.next_startlist(&advancing),
            }));
        }
        transition(self, events)
    }

    /// Opens the round the engine is waiting for.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` unless the engine is waiting.
    pub fn start_next_round(&self) -> Result<Decision, DomainError> {
        let EnginePhase::WaitingForNextRound { next_round_index } = self.phase else {
            return Err(DomainError::InvalidPhase(format!(
                "cannot start the next round while {}",
                self.phase
            )));
        };
        let advancing = next_round_index
            .checked_sub(1)
            .and_then(|previous| self.rounds.get(previous))
            .and_then(|round| round.advancing.clone())
            .ok_or_else(|| {
                DomainError::Infrastructure(format!(
                    "no advancing set recorded before round {next_round_index}"
                ))
            })?;
        transition(
            self,
            vec![CompetitionEvent::NextRoundStarted(NextRoundStarted {
                round_index: next_round_index,
                startlist: self.next_startlist(&advancing),
            })],
        )
    }

    /// Cumulative classification over every round so far. Pure; callable in
    /// any phase.
    #[must_use]
    pub fn generate_results(&self) -> Vec<ClassificationResult> {
        classify(&self.competitors, &self.rounds)
    }

    /// Startlist of the round in progress.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PolicyViolation` while no startlist exists,
    /// i.e. between a round's end and the start of the next one.
    pub fn generate_startlist(&self) -> Result<Startlist, DomainError> {
        self.startlist.clone().ok_or_else(|| {
            DomainError::PolicyViolation(format!("no startlist while {}", self.phase))
        })
    }

    /// Serializes the whole engine, including its generator state and the
    /// number of events it reflects.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, DomainError> {
        Ok(serde_json::to_vec(&SnapshotOut {
            format: SNAPSHOT_FORMAT,
            engine: self,
        })?)
    }

    /// Restores an engine from [`Self::to_snapshot`] output.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` for malformed blobs or an
    /// unknown format.
    pub fn load_snapshot(bytes: &[u8]) -> Result<Self, DomainError> {
        let snapshot: SnapshotIn = serde_json::from_slice(bytes)?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(DomainError::Infrastructure(format!(
                "unsupported competition snapshot format {}",
                snapshot.format
            )));
        }
        Ok(snapshot.engine)
    }

    fn round(&self, round_index: usize) -> Result<&RoundRecord, DomainError> {
        self.rounds.get(round_index).ok_or_else(|| {
            DomainError::Infrastructure(format!("round {round_index} was never opened"))
        })
    }

    fn bibs(&self) -> HashMap<Uuid, u32> {
        self.competitors.iter().map(|c| (c.id, c.bib)).collect()
    }

    /// Cumulative standings restricted to the participants of one round.
    fn round_standings(&self, round_index: usize) -> Vec<ClassificationResult> {
        let Some(round) = self.rounds.get(round_index) else {
            return Vec::new();
        };
        let participants: Vec<Competitor> = self
            .competitors
            .iter()
            .copied()
            .filter(|c| round.result_of(c.id).is_some())
            .collect();
        classify(&participants, &self.rounds[..=round_index])
    }

    /// Later rounds start worst first; among equal totals the higher bib
    /// jumps first.
    fn next_startlist(&self, advancing: &[Uuid]) -> Vec<Uuid> {
        let totals: HashMap<Uuid, Points> = self
            .generate_results()
            .into_iter()
            .map(|line| (line.competitor_id, line.total))
            .collect();
        let bibs = self.bibs();
        let mut order = advancing.to_vec();
        order.sort_by(|a, b| {
            totals
                .get(a)
                .cmp(&totals.get(b))
                .then(bibs.get(b).cmp(&bibs.get(a)))
        });
        order
    }

    fn started(event: &CompetitionStarted) -> Self {
        let bibs: HashMap<Uuid, u32> = event.competitors.iter().map(|c| (c.id, c.bib)).collect();
        Self {
            competition_id: event.competition_id,
            config: event.config.clone(),
            competitors: event.competitors.clone(),
            rounds: vec![RoundRecord::new(0)],
            startlist: Some(Startlist::new(0, &event.startlist, &bibs)),
            phase: EnginePhase::Running { round_index: 0 },
            rng: SeededRng::new(event.seed),
            version: 1,
        }
    }

    fn apply(&mut self, payload: &CompetitionEvent) -> Result<(), DomainError> {
        match payload {
            CompetitionEvent::CompetitionStarted(_) => {
                return Err(unexpected_payload(Self::AGGREGATE_TYPE, payload.event_type()));
            }
            CompetitionEvent::ResultRegistered(event) => {
                let startlist = self
                    .startlist
                    .as_mut()
                    .filter(|s| s.round_index() == event.round_index)
                    .ok_or_else(|| {
                        unexpected_payload(Self::AGGREGATE_TYPE, payload.event_type())
                    })?;
                startlist.mark_done(event.result.competitor_id)?;
                let round = self
                    .rounds
                    .get_mut(event.round_index)
                    .ok_or_else(|| {
                        unexpected_payload(Self::AGGREGATE_TYPE, payload.event_type())
                    })?;
                round.results.push(event.result.clone());
            }
            CompetitionEvent::RoundEnded(event) => {
                let round = self.rounds.get_mut(event.round_index).ok_or_else(|| {
                    unexpected_payload(Self::AGGREGATE_TYPE, payload.event_type())
                })?;
                round.advancing = Some(event.advancing.clone());
                self.rng = event.rng;
                if let Some(next_round_index) = event.waiting_for {
                    self.phase = EnginePhase::WaitingForNextRound { next_round_index };
                    self.startlist = None;
                }
            }
            CompetitionEvent::NextRoundStarted(event) => {
                let bibs = self.bibs();
                self.rounds.push(RoundRecord::new(event.round_index));
                self.startlist = Some(Startlist::new(event.round_index, &event.startlist, &bibs));
                self.phase = EnginePhase::Running {
                    round_index: event.round_index,
                };
            }
            CompetitionEvent::CompetitionEnded(_) => {
                self.phase = EnginePhase::Ended;
            }
        }
        Ok(())
    }
}

impl AggregateRoot for CompetitionEngine {
    const AGGREGATE_TYPE: &'static str = "game_competition";
    type Payload = CompetitionEvent;

    fn aggregate_id(&self) -> Uuid {
        self.competition_id
    }

    fn evolve(state: Option<Self>, payload: &Self::Payload) -> Result<Self, DomainError> {
        match (state, payload) {
            (None, CompetitionEvent::CompetitionStarted(event)) => Ok(Self::started(event)),
            (None, other) => Err(unexpected_payload(Self::AGGREGATE_TYPE, other.event_type())),
            (Some(mut engine), other) => {
                engine.apply(other)?;
                engine.version += 1;
                Ok(engine)
            }
        }
    }
}
