//! Podium Competition — the Competition Round Engine.
//!
//! A round-based state machine that scores attempts, decides who carries
//! into the next round, breaks ties at the cut, and produces dense-ranked
//! results. The engine owns no persistence: it is the state of the
//! `GameCompetition` aggregate, rebuilt from its latest snapshot plus the
//! events appended after it.

pub mod application;
pub mod domain;
