//! Delays applied by the sagas.

use std::time::Duration;

/// Every delay a saga waits before issuing its next command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaTimings {
    /// From session creation to the first stage.
    pub session_start_delay: Duration,
    /// Break between stages.
    pub stage_break: Duration,
    /// Between consecutive jumps.
    pub jump_interval: Duration,
    /// From the last jump of a round to closing it.
    pub round_end_delay: Duration,
    /// Between rounds when the next round waits.
    pub round_break: Duration,
    /// Time a player has for a pick before it is made for them.
    pub pick_timeout: Duration,
    /// Time a matchmaking stays open.
    pub matchmaking_timeout: Duration,
    /// From the final break opening to settlement.
    pub end_session_delay: Duration,
}

impl Default for SagaTimings {
    fn default() -> Self {
        Self {
            session_start_delay: Duration::from_secs(5),
            stage_break: Duration::from_secs(30),
            jump_interval: Duration::from_secs(2),
            round_end_delay: Duration::from_secs(3),
            round_break: Duration::from_secs(20),
            pick_timeout: Duration::from_secs(30),
            matchmaking_timeout: Duration::from_secs(60),
            end_session_delay: Duration::from_secs(10),
        }
    }
}

impl SagaTimings {
    /// Every delay set to `delay`.
    #[must_use]
    pub fn uniform(delay: Duration) -> Self {
        Self {
            session_start_delay: delay,
            stage_break: delay,
            jump_interval: delay,
            round_end_delay: delay,
            round_break: delay,
            pick_timeout: delay,
            matchmaking_timeout: delay,
            end_session_delay: delay,
        }
    }
}
