//! Event repository abstraction and the generic aggregate repository.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::aggregate::{AggregateRoot, replay};
use crate::bus::EventBus;
use crate::clock::Clock;
use crate::command::MessageContext;
use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata, EventPayload};

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate family of the stream.
    pub aggregate_type: String,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Payload schema version.
    pub schema_version: i32,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

impl StoredEvent {
    /// Returns `true` if the event belongs to aggregate family `A`.
    #[must_use]
    pub fn is_from<A: AggregateRoot>(&self) -> bool {
        self.aggregate_type == A::AGGREGATE_TYPE
    }

    /// Decodes the payload of an event belonging to aggregate family `A`.
    /// Returns `Ok(None)` for events of other families.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if deserialization fails.
    pub fn decode<A: AggregateRoot>(&self) -> Result<Option<A::Payload>, DomainError> {
        if !self.is_from::<A>() {
            return Ok(None);
        }
        serde_json::from_value(self.payload.clone())
            .map(Some)
            .map_err(|e| DomainError::Infrastructure(format!("event deserialization failed: {e}")))
    }
}

/// Repository trait for loading and appending domain events (the event
/// store). Streams are keyed by aggregate family and aggregate id.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load all events for a given aggregate, ordered by sequence number.
    async fn load_events(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    /// `expected_version` is the last known sequence number. The append is
    /// atomic: either every event is written or none is.
    async fn append_events(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;
}

/// An aggregate loaded from its stream together with the stream version.
#[derive(Debug, Clone)]
pub struct Loaded<A> {
    /// Reconstituted state.
    pub state: A,
    /// Number of events in the stream.
    pub version: i64,
}

/// Generic load-by-replay / save-with-expected-version repository.
pub struct AggregateRepository<A> {
    events: Arc<dyn EventRepository>,
    bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> Clone for AggregateRepository<A> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            bus: Arc::clone(&self.bus),
            clock: Arc::clone(&self.clock),
            _aggregate: PhantomData,
        }
    }
}

impl<A: AggregateRoot> AggregateRepository<A> {
    /// Creates a repository over the given event store, bus and clock.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventRepository>,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            bus,
            clock,
            _aggregate: PhantomData,
        }
    }

    /// Loads and decodes the full event history of an aggregate.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if loading or deserialization fails.
    pub async fn load_history(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Vec<DomainEvent<A::Payload>>, DomainError> {
        self.events
            .load_events(A::AGGREGATE_TYPE, aggregate_id)
            .await?
            .iter()
            .map(DomainEvent::from_stored)
            .collect()
    }

    /// Rebuilds an aggregate by folding its history. Returns `None` for an
    /// empty stream.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if loading, deserialization or folding fails.
    pub async fn load(&self, aggregate_id: Uuid) -> Result<Option<Loaded<A>>, DomainError> {
        let history = self.load_history(aggregate_id).await?;
        #[allow(clippy::cast_possible_wrap)]
        let version = history.len() as i64;
        let state = replay::<A, _>(history.iter().map(|e| &e.payload))?;
        Ok(state.map(|state| Loaded { state, version }))
    }

    /// Like [`Self::load`] but an empty stream is an error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if no events exist.
    pub async fn load_existing(&self, aggregate_id: Uuid) -> Result<Loaded<A>, DomainError> {
        self.load(aggregate_id)
            .await?
            .ok_or(DomainError::AggregateNotFound(aggregate_id))
    }

    /// Stamps `payloads` into full events, appends them with
    /// `expected_version`, then publishes them.
    ///
    /// A publication failure after a successful append is logged and does
    /// not fail the save: the stream is the source of truth.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the stream moved past
    /// `expected_version`, or any store error.
    pub async fn save(
        &self,
        aggregate_id: Uuid,
        payloads: &[A::Payload],
        expected_version: i64,
        context: &MessageContext,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let occurred_at = self.clock.now();
        let stored: Vec<StoredEvent> = payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| {
                #[allow(clippy::cast_possible_wrap)]
                let sequence_number = expected_version + index as i64 + 1;
                DomainEvent {
                    metadata: EventMetadata {
                        event_id: Uuid::now_v7(),
                        event_type: payload.event_type().to_owned(),
                        aggregate_type: A::AGGREGATE_TYPE.to_owned(),
                        aggregate_id,
                        sequence_number,
                        schema_version: A::Payload::SCHEMA_VERSION,
                        correlation_id: context.correlation_id,
                        causation_id: context.message_id,
                        occurred_at,
                    },
                    payload: payload.clone(),
                }
                .to_stored()
            })
            .collect();

        self.events
            .append_events(A::AGGREGATE_TYPE, aggregate_id, expected_version, &stored)
            .await?;

        debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            %aggregate_id,
            count = stored.len(),
            "appended events"
        );

        if let Err(e) = self.bus.publish(&stored).await {
            warn!(
                aggregate_type = A::AGGREGATE_TYPE,
                %aggregate_id,
                error = %e,
                "event publication failed after append; subscribers may miss these events"
            );
        }

        Ok(stored)
    }

    /// Returns the stream length.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if loading fails.
    pub async fn get_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        let events = self
            .events
            .load_events(A::AGGREGATE_TYPE, aggregate_id)
            .await?;
        #[allow(clippy::cast_possible_wrap)]
        let version = events.len() as i64;
        Ok(version)
    }

    /// Returns `true` if the stream has at least one event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if loading fails.
    pub async fn exists(&self, aggregate_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.get_version(aggregate_id).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::aggregate::unexpected_payload;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum LampPayload {
        Installed { id: Uuid },
        Toggled,
    }

    impl EventPayload for LampPayload {
        fn event_type(&self) -> &'static str {
            match self {
                Self::Installed { .. } => "lamp.installed",
                Self::Toggled => "lamp.toggled",
            }
        }
    }

    #[derive(Debug, Clone)]
    struct Lamp {
        id: Uuid,
        on: bool,
    }

    impl AggregateRoot for Lamp {
        const AGGREGATE_TYPE: &'static str = "lamp";
        type Payload = LampPayload;

        fn aggregate_id(&self) -> Uuid {
            self.id
        }

        fn evolve(state: Option<Self>, payload: &Self::Payload) -> Result<Self, DomainError> {
            match (state, payload) {
                (None, LampPayload::Installed { id }) => Ok(Self { id: *id, on: false }),
                (Some(lamp), LampPayload::Toggled) => Ok(Self { on: !lamp.on, ..lamp }),
                (_, other) => Err(unexpected_payload(Self::AGGREGATE_TYPE, other.event_type())),
            }
        }
    }

    #[derive(Default)]
    struct MemoryEvents {
        streams: Mutex<HashMap<(String, Uuid), Vec<StoredEvent>>>,
    }

    #[async_trait]
    impl EventRepository for MemoryEvents {
        async fn load_events(
            &self,
            aggregate_type: &str,
            aggregate_id: Uuid,
        ) -> Result<Vec<StoredEvent>, DomainError> {
            let streams = self.streams.lock().unwrap();
            Ok(streams
                .get(&(aggregate_type.to_owned(), aggregate_id))
                .cloned()
                .unwrap_or_default())
        }

        async fn append_events(
            &self,
            aggregate_type: &str,
            aggregate_id: Uuid,
            expected_version: i64,
            events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            let mut streams = self.streams.lock().unwrap();
            let stream = streams
                .entry((aggregate_type.to_owned(), aggregate_id))
                .or_default();
            let actual = stream.len() as i64;
            if actual != expected_version {
                return Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_version,
                    actual,
                });
            }
            stream.extend_from_slice(events);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingBus {
        published: Mutex<Vec<StoredEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl EventBus for CountingBus {
        async fn publish(&self, events: &[StoredEvent]) -> Result<(), DomainError> {
            if self.fail {
                return Err(DomainError::Infrastructure("bus offline".into()));
            }
            self.published.lock().unwrap().extend_from_slice(events);
            Ok(())
        }
    }

    struct StaticClock(DateTime<Utc>);

    impl Clock for StaticClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn repository(bus: Arc<CountingBus>) -> (Arc<MemoryEvents>, AggregateRepository<Lamp>) {
        let events = Arc::new(MemoryEvents::default());
        let repo = AggregateRepository::new(
            events.clone(),
            bus,
            Arc::new(StaticClock(fixed_now())),
        );
        (events, repo)
    }

    #[tokio::test]
    async fn test_save_stamps_metadata_and_publishes() {
        // Arrange
        let bus = Arc::new(CountingBus::default());
        let (_, repo) = repository(bus.clone());
        let id = Uuid::new_v4();
        let ctx = MessageContext::new_root();

        // Act
        let stored = repo
            .save(id, &[LampPayload::Installed { id }, LampPayload::Toggled], 0, &ctx)
            .await
            .unwrap();

        // Assert
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].sequence_number, 1);
        assert_eq!(stored[1].sequence_number, 2);
        assert_eq!(stored[1].event_type, "lamp.toggled");
        assert_eq!(stored[0].aggregate_type, "lamp");
        assert_eq!(stored[0].correlation_id, ctx.correlation_id);
        assert_eq!(stored[0].causation_id, ctx.message_id);
        assert_eq!(stored[0].occurred_at, fixed_now());
        assert_eq!(bus.published.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_load_folds_history_and_reports_version() {
        let (_, repo) = repository(Arc::new(CountingBus::default()));
        let id = Uuid::new_v4();
        let ctx = MessageContext::new_root();
        repo.save(id, &[LampPayload::Installed { id }], 0, &ctx)
            .await
            .unwrap();
        repo.save(id, &[LampPayload::Toggled], 1, &ctx).await.unwrap();

        let loaded = repo.load(id).await.unwrap().unwrap();

        assert!(loaded.state.on);
        assert_eq!(loaded.version, 2);
        assert_eq!(repo.get_version(id).await.unwrap(), 2);
        assert!(repo.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_load_of_unknown_stream_is_none() {
        let (_, repo) = repository(Arc::new(CountingBus::default()));
        let id = Uuid::new_v4();

        assert!(repo.load(id).await.unwrap().is_none());
        assert!(!repo.exists(id).await.unwrap());
        assert!(matches!(
            repo.load_existing(id).await,
            Err(DomainError::AggregateNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_save_with_stale_version_conflicts_without_partial_append() {
        // Arrange
        let bus = Arc::new(CountingBus::default());
        let (events, repo) = repository(bus.clone());
        let id = Uuid::new_v4();
        let ctx = MessageContext::new_root();
        repo.save(id, &[LampPayload::Installed { id }], 0, &ctx)
            .await
            .unwrap();
        repo.save(id, &[LampPayload::Toggled], 1, &ctx).await.unwrap();

        // Act
        let result = repo
            .save(id, &[LampPayload::Toggled, LampPayload::Toggled], 1, &ctx)
            .await;

        // Assert
        match result {
            Err(DomainError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        assert_eq!(events.load_events("lamp", id).await.unwrap().len(), 2);
        assert_eq!(bus.published.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_publication_failure_does_not_fail_save() {
        let bus = Arc::new(CountingBus {
            fail: true,
            ..CountingBus::default()
        });
        let (events, repo) = repository(bus);
        let id = Uuid::new_v4();

        let stored = repo
            .save(id, &[LampPayload::Installed { id }], 0, &MessageContext::new_root())
            .await
            .unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(events.load_events("lamp", id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_without_payloads_appends_nothing() {
        let bus = Arc::new(CountingBus::default());
        let (events, repo) = repository(bus.clone());
        let id = Uuid::new_v4();

        let stored = repo.save(id, &[], 0, &MessageContext::new_root()).await.unwrap();

        assert!(stored.is_empty());
        assert!(events.load_events("lamp", id).await.unwrap().is_empty());
        assert!(bus.published.lock().unwrap().is_empty());
    }

    #[test]
    fn test_decode_skips_foreign_aggregate_types() {
        let stored = StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_type: "kettle".to_owned(),
            aggregate_id: Uuid::new_v4(),
            event_type: "kettle.boiled".to_owned(),
            schema_version: 1,
            payload: serde_json::json!({"Boiled": {}}),
            sequence_number: 1,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: fixed_now(),
        };

        assert!(stored.decode::<Lamp>().unwrap().is_none());
    }
}
