//! Domain event abstractions.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name for deserialization routing.
    pub event_type: String,
    /// Aggregate family the stream belongs to.
    pub aggregate_type: String,
    /// Aggregate/stream this event belongs to.
    pub aggregate_id: Uuid,
    /// Monotonically increasing version within the aggregate stream.
    pub sequence_number: i64,
    /// Version of the payload schema at write time.
    pub schema_version: i32,
    /// Correlation ID, stable across a whole multi-aggregate workflow.
    pub correlation_id: Uuid,
    /// Causation ID linking this event to the command that produced it.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Trait implemented by the payload enum of every aggregate family.
pub trait EventPayload: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Schema version stamped on newly written events.
    const SCHEMA_VERSION: i32 = 1;

    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;
}

/// A fully stamped, immutable domain event with a typed payload.
#[derive(Debug, Clone)]
pub struct DomainEvent<P> {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub payload: P,
}

impl<P: EventPayload> DomainEvent<P> {
    /// Decodes a typed event from its stored representation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if payload deserialization fails.
    pub fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let payload: P = serde_json::from_value(stored.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("event deserialization failed: {e}"))
        })?;
        Ok(Self {
            metadata: EventMetadata {
                event_id: stored.event_id,
                event_type: stored.event_type.clone(),
                aggregate_type: stored.aggregate_type.clone(),
                aggregate_id: stored.aggregate_id,
                sequence_number: stored.sequence_number,
                schema_version: stored.schema_version,
                correlation_id: stored.correlation_id,
                causation_id: stored.causation_id,
                occurred_at: stored.occurred_at,
            },
            payload,
        })
    }

    /// Converts the event into its stored representation.
    #[must_use]
    pub fn to_stored(&self) -> StoredEvent {
        let meta = &self.metadata;
        StoredEvent {
            event_id: meta.event_id,
            aggregate_type: meta.aggregate_type.clone(),
            aggregate_id: meta.aggregate_id,
            event_type: meta.event_type.clone(),
            schema_version: meta.schema_version,
            // Serialization of derived Serialize types to Value is infallible.
            payload: serde_json::to_value(&self.payload)
                .expect("event payload serialization is infallible"),
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
        }
    }
}
