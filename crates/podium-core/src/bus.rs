//! Event bus abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// Fan-out of appended events to subscribers (at-least-once).
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes events that have already been appended to their stream.
    async fn publish(&self, events: &[StoredEvent]) -> Result<(), DomainError>;
}

/// A subscriber of the event bus. Handlers must tolerate re-delivery.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler name used in logs.
    fn name(&self) -> &'static str;

    /// Reacts to one event.
    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError>;
}
