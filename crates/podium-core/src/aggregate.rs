//! Aggregate root abstraction.
//!
//! Aggregates are rebuilt by a pure left fold of [`AggregateRoot::evolve`]
//! over their ordered payloads, starting from an absent state. Mutations
//! never touch the current state: they produce new payloads and fold them
//! into a fresh copy with [`transition`].

use uuid::Uuid;

use crate::error::DomainError;
use crate::event::EventPayload;

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Clone + Send + Sync + Sized + 'static {
    /// Name of the aggregate family; each family has its own streams.
    const AGGREGATE_TYPE: &'static str;

    /// The payload type this aggregate produces and consumes.
    type Payload: EventPayload;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Folds one payload into the state. `None` means the stream is empty so
    /// far; only creation payloads are valid there.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot follow the
    /// given state (a corrupt or foreign stream).
    fn evolve(state: Option<Self>, payload: &Self::Payload) -> Result<Self, DomainError>;
}

/// Rebuilds an aggregate from its full payload history.
///
/// # Errors
///
/// Propagates the first `evolve` failure.
pub fn replay<'a, A, I>(payloads: I) -> Result<Option<A>, DomainError>
where
    A: AggregateRoot,
    I: IntoIterator<Item = &'a A::Payload>,
{
    payloads
        .into_iter()
        .try_fold(None, |state, payload| A::evolve(state, payload).map(Some))
}

/// Folds freshly decided payloads into a copy of `state`.
///
/// # Errors
///
/// Propagates the first `evolve` failure.
pub fn transition<A: AggregateRoot>(
    state: &A,
    payloads: Vec<A::Payload>,
) -> Result<(A, Vec<A::Payload>), DomainError> {
    let mut next = state.clone();
    for payload in &payloads {
        next = A::evolve(Some(next), payload)?;
    }
    Ok((next, payloads))
}

/// Folds the initial payloads of a new aggregate.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `payloads` is empty, and propagates
/// `evolve` failures.
pub fn create<A: AggregateRoot>(payloads: Vec<A::Payload>) -> Result<(A, Vec<A::Payload>), DomainError> {
    let state = replay::<A, _>(&payloads)?.ok_or_else(|| {
        DomainError::Validation(format!("{} creation produced no events", A::AGGREGATE_TYPE))
    })?;
    Ok((state, payloads))
}

/// Error for a payload that cannot be applied to the current state.
#[must_use]
pub fn unexpected_payload(aggregate_type: &str, event_type: &str) -> DomainError {
    DomainError::Infrastructure(format!(
        "{aggregate_type} stream cannot apply {event_type} in its current state"
    ))
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterPayload {
        Opened { id: Uuid },
        Bumped { by: u32 },
    }

    impl EventPayload for CounterPayload {
        fn event_type(&self) -> &'static str {
            match self {
                Self::Opened { .. } => "counter.opened",
                Self::Bumped { .. } => "counter.bumped",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Counter {
        id: Uuid,
        total: u32,
    }

    impl AggregateRoot for Counter {
        const AGGREGATE_TYPE: &'static str = "counter";
        type Payload = CounterPayload;

        fn aggregate_id(&self) -> Uuid {
            self.id
        }

        fn evolve(state: Option<Self>, payload: &Self::Payload) -> Result<Self, DomainError> {
            match (state, payload) {
                (None, CounterPayload::Opened { id }) => Ok(Self { id: *id, total: 0 }),
                (Some(c), CounterPayload::Bumped { by }) => Ok(Self {
                    total: c.total + by,
                    ..c
                }),
                (_, other) => Err(unexpected_payload(Self::AGGREGATE_TYPE, other.event_type())),
            }
        }
    }

    #[test]
    fn test_replay_of_empty_history_is_absent() {
        let state = replay::<Counter, _>(&[]).unwrap();

        assert!(state.is_none());
    }

    #[test]
    fn test_replay_folds_in_order() {
        let id = Uuid::new_v4();
        let history = vec![
            CounterPayload::Opened { id },
            CounterPayload::Bumped { by: 2 },
            CounterPayload::Bumped { by: 5 },
        ];

        let state = replay::<Counter, _>(&history).unwrap().unwrap();

        assert_eq!(state, Counter { id, total: 7 });
    }

    #[test]
    fn test_transition_leaves_original_untouched() {
        let (original, _) = create::<Counter>(vec![CounterPayload::Opened { id: Uuid::new_v4() }])
            .unwrap();

        let (next, payloads) =
            transition(&original, vec![CounterPayload::Bumped { by: 3 }]).unwrap();

        assert_eq!(original.total, 0);
        assert_eq!(next.total, 3);
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn test_replay_rejects_stream_without_creation_event() {
        let result = replay::<Counter, _>(&[CounterPayload::Bumped { by: 1 }]);

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
