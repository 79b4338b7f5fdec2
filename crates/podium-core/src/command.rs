//! Command abstractions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug + 'static {
    /// Value returned to callers of the result-returning send variant.
    type Output: Send + 'static;

    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;
}

/// Causal identifiers travelling with every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageContext {
    /// Identifier of this message. Events produced by the command use it as
    /// their causation ID.
    pub message_id: Uuid,
    /// Correlation ID, stable across the whole workflow.
    pub correlation_id: Uuid,
    /// The event or message that caused this one.
    pub causation_id: Uuid,
}

impl MessageContext {
    /// Starts a new workflow: the message is its own correlation and cause.
    #[must_use]
    pub fn new_root() -> Self {
        let id = Uuid::now_v7();
        Self {
            message_id: id,
            correlation_id: id,
            causation_id: id,
        }
    }

    /// Context for a command issued in reaction to `event`.
    #[must_use]
    pub fn caused_by(event: &StoredEvent) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            correlation_id: event.correlation_id,
            causation_id: event.event_id,
        }
    }

    /// Context for a command issued while handling this message.
    #[must_use]
    pub fn follow_up(&self) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            correlation_id: self.correlation_id,
            causation_id: self.message_id,
        }
    }
}

/// A command together with its message context.
#[derive(Debug, Clone)]
pub struct CommandEnvelope<C> {
    /// The command itself.
    pub command: C,
    /// Correlation and causation identifiers.
    pub context: MessageContext,
}

impl<C> CommandEnvelope<C> {
    /// Wraps `command` with an explicit context.
    pub fn new(command: C, context: MessageContext) -> Self {
        Self { command, context }
    }

    /// Wraps `command` as the first message of a new workflow.
    pub fn root(command: C) -> Self {
        Self::new(command, MessageContext::new_root())
    }

    /// Correlation ID shortcut.
    pub fn correlation_id(&self) -> Uuid {
        self.context.correlation_id
    }
}

/// Handles one concrete command type.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Handles the command to completion.
    async fn handle(&self, envelope: CommandEnvelope<C>) -> Result<C::Output, DomainError>;
}
