//! Podium Messaging — event and command routing.
//!
//! The event bus fans appended events out to every subscriber (sagas,
//! projections) at least once. The command bus routes a typed command to the
//! single handler registered for its concrete type.

pub mod command_bus;
pub mod event_bus;

pub use command_bus::CommandBus;
pub use event_bus::InProcessEventBus;
