//! Domain layer of the matchmaking context.

pub mod aggregates;
pub mod commands;
pub mod events;
