//! Domain layer of the session context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod phases;
pub mod ranking;
pub mod settings;
