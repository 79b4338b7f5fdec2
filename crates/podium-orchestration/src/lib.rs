//! Podium Orchestration — the saga layer and its runtime.
//!
//! Sagas subscribe to the event bus and translate "aggregate X reached
//! state S" into commands against other aggregates, either dispatched at
//! once or scheduled through the durable scheduler with an idempotency key.
//! They hold no state of their own beyond the append-only child to owner
//! lookups they populate.

pub mod lookup;
pub mod runtime;
pub mod sagas;
pub mod timings;
pub mod wiring;

pub use lookup::{InMemoryOwnerLookup, KvOwnerLookup, OwnerLookup, OwnerLookupResult};
pub use runtime::{PodiumRuntime, RuntimeOptions, RuntimeStores};
pub use timings::SagaTimings;
