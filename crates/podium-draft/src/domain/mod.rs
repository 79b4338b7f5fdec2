//! Domain layer of the draft context.

pub mod aggregates;
pub mod commands;
pub mod events;
