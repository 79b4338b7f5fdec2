//! Podium Draft — players pick the competitors they will score with.
//!
//! Picks follow snake order. When a player lets the pick timer run out the
//! pick is made for them by a weighted draw over the remaining candidates,
//! seeded by the draft and the pick index so it replays identically.

pub mod application;
pub mod domain;
