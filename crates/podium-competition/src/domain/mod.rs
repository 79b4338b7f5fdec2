//! Domain layer of the competition context.

pub mod advancement;
pub mod commands;
pub mod config;
pub mod engine;
pub mod events;
pub mod results;
pub mod scoring;
pub mod simulator;
