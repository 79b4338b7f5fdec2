//! Podium Scheduler — durable, deduplicated, time-delayed dispatch.
//!
//! Jobs are persisted in a [`JobStore`](podium_core::job::JobStore) before a
//! timer is armed, so pending work survives a restart and is re-armed by
//! [`Scheduler::recover`]. When a job fires, its type is resolved through the
//! [`JobRegistry`] and the decoded command is dispatched on the command bus.

pub mod registry;
pub mod scheduler;

pub use registry::{JobPayload, JobRegistry, ScheduledCommand};
pub use scheduler::{ScheduleOutcome, Scheduler};
