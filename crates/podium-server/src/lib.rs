//! Podium server — configuration, telemetry and store selection for the
//! process hosting the orchestrator.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod stores;
pub mod telemetry;
