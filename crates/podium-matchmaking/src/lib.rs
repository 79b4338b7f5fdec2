//! Podium Matchmaking — gathering players into a session.
//!
//! A matchmaking is open until it is full or its timeout fires. Ending with
//! at least the minimum number of players hands the roster to the session
//! workflow; ending below it fails the matchmaking.

pub mod application;
pub mod domain;
