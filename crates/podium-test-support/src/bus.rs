//! Test buses — `EventBus` doubles.

use std::sync::Mutex;

use async_trait::async_trait;
use podium_core::bus::EventBus;
use podium_core::error::DomainError;
use podium_core::repository::StoredEvent;

/// An event bus that records every published event.
#[derive(Debug, Default)]
pub struct RecordingEventBus {
    published: Mutex<Vec<StoredEvent>>,
}

impl RecordingEventBus {
    /// Returns a snapshot of all events that were published.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_events(&self) -> Vec<StoredEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the event types of all published events, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_types(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn publish(&self, events: &[StoredEvent]) -> Result<(), DomainError> {
        self.published.lock().unwrap().extend_from_slice(events);
        Ok(())
    }
}

/// An event bus that drops every event.
#[derive(Debug, Default)]
pub struct NullEventBus;

#[async_trait]
impl EventBus for NullEventBus {
    async fn publish(&self, _events: &[StoredEvent]) -> Result<(), DomainError> {
        Ok(())
    }
}
