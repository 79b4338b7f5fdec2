//! Jump simulation boundary.
//!
//! Physics and weather modelling live outside this crate; the engine only
//! needs `simulate(context) -> attempt`. The default simulator derives all
//! randomness from the competition, round and competitor ids, so the same
//! jump always produces the same attempt.

use podium_core::rng::{DeterministicRng, SeededRng, derive_seed};
use uuid::Uuid;

use super::config::Competitor;
use super::scoring::{Attempt, HillProfile};

/// Everything a simulator may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpContext {
    /// Competition being simulated.
    pub competition_id: Uuid,
    /// Round of the attempt.
    pub round_index: usize,
    /// Who jumps.
    pub competitor: Competitor,
    /// Hill geometry.
    pub hill: HillProfile,
}

/// Produces an attempt for a jump.
pub trait JumpSimulator: Send + Sync {
    /// Simulates the jump described by `context`.
    fn simulate(&self, context: &JumpContext) -> Attempt;
}

/// Deterministic simulator seeded from the jump's identifiers.
#[derive(Debug, Clone, Copy)]
pub struct SeededJumpSimulator {
    /// Maximum distance deviation from the K point, in meters.
    pub spread: f64,
}

impl Default for SeededJumpSimulator {
    fn default() -> Self {
        Self { spread: 15.0 }
    }
}

fn half_step(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

fn tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl JumpSimulator for SeededJumpSimulator {
    fn simulate(&self, context: &JumpContext) -> Attempt {
        let round = (context.round_index as u64).to_le_bytes();
        let seed = derive_seed(&[
            context.competition_id.as_bytes().as_slice(),
            round.as_slice(),
            context.competitor.id.as_bytes().as_slice(),
        ]);
        let mut rng = SeededRng::new(seed);

        let deviation = (rng.next_f64() * 2.0 - 1.0) * self.spread;
        let distance = half_step((context.hill.k_point + deviation).max(0.0));
        let judge_marks = (0..5)
            .map(|_| f64::from(rng.next_u32_range(32, 40)) / 2.0)
            .collect();
        let wind_compensation = tenth((rng.next_f64() - 0.5) * 8.0);

        Attempt {
            distance,
            judge_marks,
            wind_compensation,
            gate_compensation: 0.0,
        }
    }
}
