//! Command bus routing each command type to exactly one handler.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use podium_core::command::{Command, CommandEnvelope, CommandHandler};
use podium_core::error::DomainError;
use tracing::{Instrument, debug, info_span};

type HandlerSlot = Box<dyn Any + Send + Sync>;

/// Routes commands to their registered handler.
///
/// Handlers are registered per concrete command type during wiring. The bus
/// is cheap to share behind an `Arc`.
#[derive(Default)]
pub struct CommandBus {
    handlers: RwLock<HashMap<TypeId, HandlerSlot>>,
}

impl CommandBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for command type `C`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if `C` already has a handler.
    pub fn register<C: Command>(
        &self,
        handler: Arc<dyn CommandHandler<C>>,
    ) -> Result<(), DomainError> {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| DomainError::Infrastructure("command bus lock poisoned".to_owned()))?;
        let key = TypeId::of::<C>();
        if handlers.contains_key(&key) {
            return Err(DomainError::Configuration(format!(
                "a handler for {} is already registered",
                type_name::<C>()
            )));
        }
        handlers.insert(key, Box::new(handler));
        debug!(command = type_name::<C>(), "registered command handler");
        Ok(())
    }

    /// Returns `true` if command type `C` has a handler.
    #[must_use]
    pub fn has_handler<C: Command>(&self) -> bool {
        self.handlers
            .read()
            .is_ok_and(|handlers| handlers.contains_key(&TypeId::of::<C>()))
    }

    /// Sends a command and returns the handler's output.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if no handler is registered, or
    /// whatever the handler returns.
    pub async fn send<C: Command>(
        &self,
        envelope: CommandEnvelope<C>,
    ) -> Result<C::Output, DomainError> {
        let handler = self.handler_for::<C>()?;
        let span = info_span!(
            "command",
            command_type = envelope.command.command_type(),
            correlation_id = %envelope.context.correlation_id,
            message_id = %envelope.context.message_id
        );
        handler.handle(envelope).instrument(span).await
    }

    /// Sends a command and discards its output.
    ///
    /// # Errors
    ///
    /// Same as [`Self::send`].
    pub async fn dispatch<C: Command>(&self, envelope: CommandEnvelope<C>) -> Result<(), DomainError> {
        self.send(envelope).await.map(|_| ())
    }

    fn handler_for<C: Command>(&self) -> Result<Arc<dyn CommandHandler<C>>, DomainError> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| DomainError::Infrastructure("command bus lock poisoned".to_owned()))?;
        handlers
            .get(&TypeId::of::<C>())
            .and_then(|slot| slot.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .cloned()
            .ok_or_else(|| {
                DomainError::Configuration(format!(
                    "no handler registered for {}",
                    type_name::<C>()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    #[derive(Debug)]
    struct Double(i64);

    impl Command for Double {
        type Output = i64;

        fn command_type(&self) -> &'static str {
            "test.double"
        }
    }

    #[derive(Debug)]
    struct Unrouted;

    impl Command for Unrouted {
        type Output = ();

        fn command_type(&self) -> &'static str {
            "test.unrouted"
        }
    }

    struct Doubler;

    #[async_trait]
    impl CommandHandler<Double> for Doubler {
        async fn handle(&self, envelope: CommandEnvelope<Double>) -> Result<i64, DomainError> {
            Ok(envelope.command.0 * 2)
        }
    }

    #[tokio::test]
    async fn test_send_returns_handler_output() {
        // Arrange
        let bus = CommandBus::new();
        bus.register::<Double>(Arc::new(Doubler)).unwrap();

        // Act
        let output = bus.send(CommandEnvelope::root(Double(21))).await.unwrap();

        // Assert
        assert_eq!(output, 42);
        assert!(bus.has_handler::<Double>());
    }

    #[tokio::test]
    async fn test_send_without_handler_is_configuration_error() {
        let bus = CommandBus::new();

        let result = bus.dispatch(CommandEnvelope::root(Unrouted)).await;

        assert!(matches!(result, Err(DomainError::Configuration(_))));
        assert!(!bus.has_handler::<Unrouted>());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let bus = CommandBus::new();
        bus.register::<Double>(Arc::new(Doubler)).unwrap();

        let result = bus.register::<Double>(Arc::new(Doubler));

        assert!(matches!(result, Err(DomainError::Configuration(_))));
    }
}
