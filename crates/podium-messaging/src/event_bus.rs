//! In-process event bus.
//!
//! Each published event is dispatched on its own task; for one event the
//! subscribers run sequentially in registration order. Different events may
//! be dispatched concurrently, so subscribers must be idempotent.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use podium_core::bus::{EventBus, EventHandler};
use podium_core::error::DomainError;
use podium_core::repository::StoredEvent;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info_span};

/// Event bus fanning events out to in-process subscribers.
#[derive(Default)]
pub struct InProcessEventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl InProcessEventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. Subscribers are meant to be registered during
    /// wiring, before the first publication.
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        match self.handlers.write() {
            Ok(mut handlers) => handlers.push(handler),
            Err(poisoned) => poisoned.into_inner().push(handler),
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().map_or(0, |handlers| handlers.len())
    }

    /// Waits until every in-flight dispatch, including dispatches of events
    /// published by the subscribers themselves, has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stops accepting events and waits for in-flight dispatches.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn snapshot(&self) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .map(|handlers| handlers.clone())
            .unwrap_or_default()
    }
}

async fn dispatch(event: StoredEvent, handlers: Vec<Arc<dyn EventHandler>>) {
    for handler in handlers {
        if let Err(e) = handler.handle(&event).await {
            error!(
                handler = handler.name(),
                event_id = %event.event_id,
                event_type = %event.event_type,
                error = %e,
                "event handler failed"
            );
        }
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn publish(&self, events: &[StoredEvent]) -> Result<(), DomainError> {
        if self.shutdown.is_cancelled() {
            return Err(DomainError::Infrastructure(
                "event bus is shut down".to_owned(),
            ));
        }
        let handlers = self.snapshot();
        for event in events {
            debug!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                subscribers = handlers.len(),
                "publishing event"
            );
            let span = info_span!(
                "dispatch_event",
                event_type = %event.event_type,
                correlation_id = %event.correlation_id
            );
            self.tracker
                .spawn(dispatch(event.clone(), handlers.clone()).instrument(span));
        }
        Ok(())
    }
}
