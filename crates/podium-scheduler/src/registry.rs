//! Mapping from job type names to concrete commands.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use podium_core::command::{CommandEnvelope, MessageContext};
use podium_core::error::DomainError;
pub use podium_core::job::ScheduledCommand;
use podium_messaging::CommandBus;
use serde::{Deserialize, Serialize};

/// Serialized form of a scheduled command: the command and the context it
/// will be dispatched with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload<C> {
    /// The command to dispatch.
    pub command: C,
    /// Correlation and causation identifiers of the dispatch.
    pub context: MessageContext,
}

impl<C: ScheduledCommand> JobPayload<C> {
    /// Encodes an envelope as a job payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the command fails to
    /// serialize.
    pub fn encode(envelope: CommandEnvelope<C>) -> Result<serde_json::Value, DomainError> {
        let payload = Self {
            command: envelope.command,
            context: envelope.context,
        };
        Ok(serde_json::to_value(payload)?)
    }

    /// Decodes a job payload back into an envelope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload does not match
    /// the command's shape.
    pub fn decode(payload: serde_json::Value) -> Result<CommandEnvelope<C>, DomainError> {
        let payload: Self = serde_json::from_value(payload)?;
        Ok(CommandEnvelope::new(payload.command, payload.context))
    }
}

#[async_trait]
trait JobDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        bus: &CommandBus,
        payload: serde_json::Value,
    ) -> Result<(), DomainError>;
}

struct CommandJob<C>(PhantomData<fn() -> C>);

#[async_trait]
impl<C: ScheduledCommand> JobDispatcher for CommandJob<C> {
    async fn dispatch(
        &self,
        bus: &CommandBus,
        payload: serde_json::Value,
    ) -> Result<(), DomainError> {
        let envelope = JobPayload::<C>::decode(payload)?;
        bus.dispatch(envelope).await
    }
}

/// Registry of job types known to the scheduler. Built during wiring and
/// immutable afterwards.
#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<&'static str, Arc<dyn JobDispatcher>>,
}

impl JobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers command `C` under its `JOB_TYPE`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the job type is already taken.
    pub fn register<C: ScheduledCommand>(&mut self) -> Result<(), DomainError> {
        if self.jobs.contains_key(C::JOB_TYPE) {
            return Err(DomainError::Configuration(format!(
                "job type {} is already registered",
                C::JOB_TYPE
            )));
        }
        self.jobs
            .insert(C::JOB_TYPE, Arc::new(CommandJob::<C>(PhantomData)));
        Ok(())
    }

    /// Returns `true` if `job_type` is registered.
    #[must_use]
    pub fn contains(&self, job_type: &str) -> bool {
        self.jobs.contains_key(job_type)
    }

    /// Registered job type names, sorted.
    #[must_use]
    pub fn job_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.jobs.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Decodes `payload` for `job_type` and dispatches it on `bus`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` for an unknown job type, or the
    /// decode/dispatch failure.
    pub async fn dispatch(
        &self,
        bus: &CommandBus,
        job_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), DomainError> {
        let dispatcher = self.jobs.get(job_type).ok_or_else(|| {
            DomainError::Configuration(format!("unknown job type {job_type}"))
        })?;
        dispatcher.dispatch(bus, payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use podium_core::command::{Command, CommandHandler};
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ping {
        session_id: Uuid,
    }

    impl Command for Ping {
        type Output = ();

        fn command_type(&self) -> &'static str {
            "test.ping"
        }
    }

    impl ScheduledCommand for Ping {
        const JOB_TYPE: &'static str = "Ping";
    }

    #[derive(Default)]
    struct PingHandler {
        seen: Mutex<Vec<CommandEnvelope<Ping>>>,
    }

    #[async_trait]
    impl CommandHandler<Ping> for PingHandler {
        async fn handle(&self, envelope: CommandEnvelope<Ping>) -> Result<(), DomainError> {
            self.seen.lock().unwrap().push(envelope);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_decodes_command_and_context() {
        // Arrange
        let handler = Arc::new(PingHandler::default());
        let bus = CommandBus::new();
        bus.register::<Ping>(handler.clone()).unwrap();
        let mut registry = JobRegistry::new();
        registry.register::<Ping>().unwrap();
        let session_id = Uuid::new_v4();
        let envelope = CommandEnvelope::root(Ping { session_id });
        let context = envelope.context;
        let payload = JobPayload::encode(envelope).unwrap();

        // Act
        registry.dispatch(&bus, "Ping", payload).await.unwrap();

        // Assert
        let seen = handler.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].command.session_id, session_id);
        assert_eq!(seen[0].context, context);
    }

    #[tokio::test]
    async fn test_unknown_job_type_is_configuration_error() {
        let registry = JobRegistry::new();

        let result = registry
            .dispatch(&CommandBus::new(), "Nope", serde_json::json!({}))
            .await;

        assert!(matches!(result, Err(DomainError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_infrastructure_error() {
        let mut registry = JobRegistry::new();
        registry.register::<Ping>().unwrap();

        let result = registry
            .dispatch(&CommandBus::new(), "Ping", serde_json::json!({"bogus": 1}))
            .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let mut registry = JobRegistry::new();
        registry.register::<Ping>().unwrap();

        assert!(registry.register::<Ping>().is_err());
        assert_eq!(registry.job_types(), vec!["Ping"]);
    }
}
