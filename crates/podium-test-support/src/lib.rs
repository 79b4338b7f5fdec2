//! Shared test mocks and utilities for the Podium session orchestrator.

mod bus;
mod clock;
mod repository;
mod rng;

pub use bus::{NullEventBus, RecordingEventBus};
pub use clock::{FixedClock, fixed_now};
pub use repository::{
    EmptyEventRepository, FailingEventRepository, RecordedAppend, RecordingEventRepository,
};
pub use rng::{MockRng, SequenceRng};
