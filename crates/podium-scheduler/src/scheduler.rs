//! The scheduler: persist, arm, fire, complete or dead-letter.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use podium_core::clock::{Clock, duration_until};
use podium_core::command::CommandEnvelope;
use podium_core::error::DomainError;
use podium_core::job::{DeadLetter, InsertOutcome, JobStore, ScheduledJob};
use podium_messaging::CommandBus;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::registry::{JobPayload, JobRegistry, ScheduledCommand};

/// Result of a schedule request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The job was stored and armed.
    Accepted(Uuid),
    /// A pending job with the same unique key exists; nothing was scheduled.
    Deduplicated,
}

impl ScheduleOutcome {
    /// Returns `true` if a new job was armed.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

struct Inner {
    store: Arc<dyn JobStore>,
    registry: Arc<JobRegistry>,
    bus: Arc<CommandBus>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// Durable, deduplicated, time-delayed command dispatcher.
///
/// Armed jobs cannot be cancelled individually. Shutting down stops every
/// timer without completing its job, so the job stays pending and is re-armed
/// by [`Scheduler::recover`] on the next start.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Creates a scheduler. Cancelling `shutdown` stops all armed timers.
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<JobRegistry>,
        bus: Arc<CommandBus>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                registry,
                bus,
                clock,
                shutdown,
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Current time according to the scheduler's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Schedules `job_type` with `payload` to run at or after `run_at`.
    ///
    /// If `unique_key` matches a job that is still pending, the request is a
    /// no-op and the first job wins.
    ///
    /// # Errors
    ///
    /// Returns the store error if the job cannot be persisted.
    pub async fn schedule(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        run_at: DateTime<Utc>,
        unique_key: Option<String>,
    ) -> Result<ScheduleOutcome, DomainError> {
        let job = ScheduledJob {
            job_id: Uuid::now_v7(),
            job_type: job_type.to_owned(),
            payload,
            run_at,
            unique_key,
        };
        match self.inner.store.insert(&job).await? {
            InsertOutcome::Duplicate => {
                debug!(
                    job_type,
                    unique_key = job.unique_key.as_deref().unwrap_or_default(),
                    "job already pending; schedule request deduplicated"
                );
                Ok(ScheduleOutcome::Deduplicated)
            }
            InsertOutcome::Inserted => {
                debug!(job_type, job_id = %job.job_id, %run_at, "job scheduled");
                let job_id = job.job_id;
                self.arm(job);
                Ok(ScheduleOutcome::Accepted(job_id))
            }
        }
    }

    /// Schedules a command envelope as a job of type `C::JOB_TYPE`.
    ///
    /// # Errors
    ///
    /// Returns serialization or store errors.
    pub async fn schedule_command<C: ScheduledCommand>(
        &self,
        envelope: CommandEnvelope<C>,
        run_at: DateTime<Utc>,
        unique_key: Option<String>,
    ) -> Result<ScheduleOutcome, DomainError> {
        let payload = JobPayload::encode(envelope)?;
        self.schedule(C::JOB_TYPE, payload, run_at, unique_key)
            .await
    }

    /// Schedules a command envelope to run `delay` from now.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the delay is out of range,
    /// or serialization and store errors.
    pub async fn schedule_command_in<C: ScheduledCommand>(
        &self,
        envelope: CommandEnvelope<C>,
        delay: Duration,
        unique_key: Option<String>,
    ) -> Result<ScheduleOutcome, DomainError> {
        let delay = TimeDelta::from_std(delay)
            .map_err(|e| DomainError::Configuration(format!("schedule delay out of range: {e}")))?;
        let run_at = self.now() + delay;
        self.schedule_command(envelope, run_at, unique_key).await
    }

    /// Re-arms every pending job found in the store. Overdue jobs fire
    /// immediately. Returns the number of jobs armed.
    ///
    /// # Errors
    ///
    /// Returns the store error if pending jobs cannot be read.
    pub async fn recover(&self) -> Result<usize, DomainError> {
        let pending = self.inner.store.pending().await?;
        let count = pending.len();
        for job in pending {
            self.arm(job);
        }
        info!(count, "re-armed pending jobs");
        Ok(count)
    }

    /// Jobs not yet fired.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn pending_jobs(&self) -> Result<Vec<ScheduledJob>, DomainError> {
        self.inner.store.pending().await
    }

    /// Jobs whose dispatch failed.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>, DomainError> {
        self.inner.store.dead_letters().await
    }

    /// Waits until every armed job has fired and finished dispatching.
    pub async fn wait_idle(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }

    /// Stops every armed timer and waits for in-flight dispatches.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        info!("scheduler stopped");
    }

    fn arm(&self, job: ScheduledJob) {
        let inner = Arc::clone(&self.inner);
        let delay = duration_until(inner.clock.as_ref(), job.run_at);
        let span = info_span!("scheduled_job", job_type = %job.job_type, job_id = %job.job_id);
        self.inner.tracker.spawn(
            async move {
                tokio::select! {
                    () = inner.shutdown.cancelled() => {
                        debug!("scheduler shutting down; job left pending");
                    }
                    () = tokio::time::sleep(delay) => {
                        inner.fire(job).await;
                    }
                }
            }
            .instrument(span),
        );
    }
}

impl Inner {
    async fn fire(&self, job: ScheduledJob) {
        match self
            .registry
            .dispatch(&self.bus, &job.job_type, job.payload.clone())
            .await
        {
            Ok(()) => {
                debug!("job dispatched");
                if let Err(e) = self.store.complete(job.job_id).await {
                    error!(error = %e, "failed to mark job complete");
                }
            }
            Err(e) => {
                error!(error = %e, "scheduled job failed; moving to dead letters");
                if let Err(store_err) = self
                    .store
                    .dead_letter(job.job_id, &e.to_string(), self.clock.now())
                    .await
                {
                    error!(error = %store_err, "failed to record dead letter");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use podium_core::command::{Command, CommandHandler, MessageContext};
    use podium_store::InMemoryJobStore;
    use podium_test_support::{FixedClock, fixed_now};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct StartStage {
        session_id: Uuid,
    }

    impl Command for StartStage {
        type Output = ();

        fn command_type(&self) -> &'static str {
            "test.start_stage"
        }
    }

    impl ScheduledCommand for StartStage {
        const JOB_TYPE: &'static str = "StartStage";
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<CommandEnvelope<StartStage>>>,
        fail: bool,
    }

    #[async_trait]
    impl CommandHandler<StartStage> for Recorder {
        async fn handle(&self, envelope: CommandEnvelope<StartStage>) -> Result<(), DomainError> {
            self.seen.lock().unwrap().push(envelope);
            if self.fail {
                return Err(DomainError::InvalidPhase("not in a break".into()));
            }
            Ok(())
        }
    }

    struct Fixture {
        scheduler: Scheduler,
        store: Arc<InMemoryJobStore>,
        recorder: Arc<Recorder>,
    }

    fn fixture(fail: bool) -> Fixture {
        let store = Arc::new(InMemoryJobStore::new());
        let recorder = Arc::new(Recorder {
            fail,
            ..Recorder::default()
        });
        let bus = Arc::new(CommandBus::new());
        bus.register::<StartStage>(recorder.clone()).unwrap();
        let mut registry = JobRegistry::new();
        registry.register::<StartStage>().unwrap();
        let scheduler = Scheduler::new(
            store.clone(),
            Arc::new(registry),
            bus,
            Arc::new(FixedClock::default()),
            CancellationToken::new(),
        );
        Fixture {
            scheduler,
            store,
            recorder,
        }
    }

    fn envelope(session_id: Uuid) -> CommandEnvelope<StartStage> {
        CommandEnvelope::new(StartStage { session_id }, MessageContext::new_root())
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_unique_key_dispatches_exactly_once() {
        // Arrange
        let fx = fixture(false);
        let session_id = Uuid::new_v4();
        let key = Some(format!("session:{session_id}:pre-draft-0"));

        // Act
        let first = fx
            .scheduler
            .schedule_command_in(envelope(session_id), Duration::from_secs(5), key.clone())
            .await
            .unwrap();
        let second = fx
            .scheduler
            .schedule_command_in(envelope(session_id), Duration::from_secs(1), key)
            .await
            .unwrap();
        fx.scheduler.wait_idle().await;

        // Assert
        assert!(first.is_accepted());
        assert_eq!(second, ScheduleOutcome::Deduplicated);
        assert_eq!(fx.recorder.seen.lock().unwrap().len(), 1);
        assert!(fx.store.pending().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_does_not_fire_before_run_at() {
        let fx = fixture(false);

        fx.scheduler
            .schedule_command_in(envelope(Uuid::new_v4()), Duration::from_secs(30), None)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(29)).await;

        assert!(fx.recorder.seen.lock().unwrap().is_empty());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fx.recorder.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overdue_job_fires_immediately() {
        let fx = fixture(false);
        let past = fixed_now() - TimeDelta::minutes(10);

        fx.scheduler
            .schedule_command(envelope(Uuid::new_v4()), past, None)
            .await
            .unwrap();
        fx.scheduler.wait_idle().await;

        assert_eq!(fx.recorder.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_is_released_after_the_job_fires() {
        let fx = fixture(false);
        let key = Some("competition:1:round:0:end".to_owned());

        fx.scheduler
            .schedule_command_in(envelope(Uuid::new_v4()), Duration::ZERO, key.clone())
            .await
            .unwrap();
        fx.scheduler.wait_idle().await;
        let again = fx
            .scheduler
            .schedule_command_in(envelope(Uuid::new_v4()), Duration::ZERO, key)
            .await
            .unwrap();
        fx.scheduler.wait_idle().await;

        assert!(again.is_accepted());
        assert_eq!(fx.recorder.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_is_dead_lettered_and_not_retried() {
        let fx = fixture(true);

        fx.scheduler
            .schedule_command_in(envelope(Uuid::new_v4()), Duration::from_secs(1), None)
            .await
            .unwrap();
        fx.scheduler.wait_idle().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(fx.recorder.seen.lock().unwrap().len(), 1);
        let dead = fx.scheduler.dead_letters().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].job.job_type, "StartStage");
        assert!(dead[0].reason.contains("not in a break"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_job_type_is_dead_lettered() {
        let fx = fixture(false);

        fx.scheduler
            .schedule("Mystery", serde_json::json!({}), fixed_now(), None)
            .await
            .unwrap();
        fx.scheduler.wait_idle().await;

        let dead = fx.scheduler.dead_letters().await.unwrap();
        assert_eq!(dead.len(), 1);
        assert!(dead[0].reason.contains("unknown job type"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_rearms_pending_jobs_after_restart() {
        // Arrange: a job persisted by a scheduler that was shut down before
        // it fired.
        let fx = fixture(false);
        let session_id = Uuid::new_v4();
        fx.scheduler
            .schedule_command_in(envelope(session_id), Duration::from_secs(10), None)
            .await
            .unwrap();
        fx.scheduler.shutdown().await;
        assert_eq!(fx.store.pending().await.unwrap().len(), 1);

        let bus = Arc::new(CommandBus::new());
        let recorder = Arc::new(Recorder::default());
        bus.register::<StartStage>(recorder.clone()).unwrap();
        let mut registry = JobRegistry::new();
        registry.register::<StartStage>().unwrap();
        let restarted = Scheduler::new(
            fx.store.clone(),
            Arc::new(registry),
            bus,
            Arc::new(FixedClock::default()),
            CancellationToken::new(),
        );

        // Act
        let armed = restarted.recover().await.unwrap();
        restarted.wait_idle().await;

        // Assert
        assert_eq!(armed, 1);
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].command.session_id, session_id);
        assert!(fx.recorder.seen.lock().unwrap().is_empty());
    }
}
