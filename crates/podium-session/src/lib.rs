//! Podium Session — the game session that strings the stages together.
//!
//! Responsible for the stage graph (observation rounds, draft, main
//! competition, settlement), the write-once archive of stage results and
//! the final session ranking.

pub mod application;
pub mod domain;
