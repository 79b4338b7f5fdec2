//! Assembles buses, scheduler, handlers and sagas into a running system.

use std::sync::Arc;

use podium_competition::application::command_handlers::CompetitionCommandHandler;
use podium_competition::application::store::CompetitionStore;
use podium_competition::domain::simulator::{JumpSimulator, SeededJumpSimulator};
use podium_core::bus::EventBus;
use podium_core::clock::Clock;
use podium_core::command::{Command, CommandEnvelope};
use podium_core::error::DomainError;
use podium_core::job::JobStore;
use podium_core::kv::KeyValueStore;
use podium_core::repository::{AggregateRepository, EventRepository};
use podium_draft::application::command_handlers::DraftCommandHandler;
use podium_draft::domain::aggregates::Draft;
use podium_matchmaking::application::command_handlers::MatchmakingCommandHandler;
use podium_matchmaking::domain::aggregates::Matchmaking;
use podium_messaging::{CommandBus, InProcessEventBus};
use podium_scheduler::{JobRegistry, Scheduler};
use podium_session::application::archive::GameCompetitionResultsArchive;
use podium_session::application::command_handlers::GameSessionCommandHandler;
use podium_session::application::notifier::{SessionNotifier, TracingSessionNotifier};
use podium_session::application::roster::{CompetitorRoster, StaticCompetitorRoster};
use podium_session::domain::aggregates::GameSession;
use podium_session::domain::settings::GameSessionSettings;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::lookup::{KvOwnerLookup, OwnerLookup};
use crate::sagas::{CompetitionFlowSaga, DraftSaga, GameSessionSaga, MatchmakingSaga};
use crate::timings::SagaTimings;
use crate::wiring::{ContextHandlers, register_command_handlers, register_jobs};

/// The storage a runtime runs on.
#[derive(Clone)]
pub struct RuntimeStores {
    /// Event store.
    pub events: Arc<dyn EventRepository>,
    /// Snapshots, archives and lookups.
    pub kv: Arc<dyn KeyValueStore>,
    /// Scheduled jobs.
    pub jobs: Arc<dyn JobStore>,
}

/// Pluggable collaborators of a runtime.
#[derive(Clone)]
pub struct RuntimeOptions {
    /// Saga delays.
    pub timings: SagaTimings,
    /// Settings for sessions created from matchmakings.
    pub settings: GameSessionSettings,
    /// Competitor field for new sessions.
    pub roster: Arc<dyn CompetitorRoster>,
    /// Outbound notifications.
    pub notifier: Arc<dyn SessionNotifier>,
    /// Jump simulator.
    pub simulator: Arc<dyn JumpSimulator>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            timings: SagaTimings::default(),
            settings: GameSessionSettings::default(),
            roster: Arc::new(StaticCompetitorRoster::generated(40)),
            notifier: Arc::new(TracingSessionNotifier),
            simulator: Arc::new(SeededJumpSimulator::default()),
        }
    }
}

/// A fully wired system.
pub struct PodiumRuntime {
    /// Event fan-out to the sagas.
    pub events: Arc<InProcessEventBus>,
    /// Command routing.
    pub commands: Arc<CommandBus>,
    /// Delayed dispatch.
    pub scheduler: Scheduler,
    /// Matchmaking streams.
    pub matchmakings: AggregateRepository<Matchmaking>,
    /// Draft streams.
    pub drafts: AggregateRepository<Draft>,
    /// Session streams.
    pub sessions: AggregateRepository<GameSession>,
    /// Competition streams and snapshots.
    pub competitions: CompetitionStore,
    /// Archived stage results.
    pub archive: GameCompetitionResultsArchive,
    shutdown: CancellationToken,
}

impl PodiumRuntime {
    /// Wires handlers, jobs and sagas over `stores`. Pending jobs are not
    /// re-armed until [`Self::recover`] is called.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if wiring registers a command or
    /// job type twice.
    pub fn start(
        stores: RuntimeStores,
        clock: Arc<dyn Clock>,
        options: RuntimeOptions,
        shutdown: CancellationToken,
    ) -> Result<Self, DomainError> {
        let events = Arc::new(InProcessEventBus::new());
        let bus: Arc<dyn EventBus> = events.clone();
        let matchmakings =
            AggregateRepository::new(stores.events.clone(), bus.clone(), clock.clone());
        let drafts = AggregateRepository::new(stores.events.clone(), bus.clone(), clock.clone());
        let sessions = AggregateRepository::new(stores.events.clone(), bus.clone(), clock.clone());
        let competitions = CompetitionStore::new(
            AggregateRepository::new(stores.events.clone(), bus, clock.clone()),
            stores.kv.clone(),
        );
        let archive = GameCompetitionResultsArchive::new(stores.kv.clone());

        let commands = Arc::new(CommandBus::new());
        register_command_handlers(
            &commands,
            &ContextHandlers {
                matchmaking: Arc::new(MatchmakingCommandHandler::new(matchmakings.clone())),
                draft: Arc::new(DraftCommandHandler::new(drafts.clone())),
                competition: Arc::new(CompetitionCommandHandler::new(
                    competitions.clone(),
                    options.simulator.clone(),
                )),
                session: Arc::new(GameSessionCommandHandler::new(
                    sessions.clone(),
                    archive.clone(),
                    options.notifier.clone(),
                )),
            },
        )?;

        let mut registry = JobRegistry::new();
        register_jobs(&mut registry)?;
        let scheduler = Scheduler::new(
            stores.jobs.clone(),
            Arc::new(registry),
            commands.clone(),
            clock,
            shutdown.child_token(),
        );

        let session_links: Arc<dyn OwnerLookup> =
            Arc::new(KvOwnerLookup::new(stores.kv.clone(), "matchmaking"));
        let competition_links: Arc<dyn OwnerLookup> =
            Arc::new(KvOwnerLookup::new(stores.kv.clone(), "competition"));
        let draft_links: Arc<dyn OwnerLookup> =
            Arc::new(KvOwnerLookup::new(stores.kv, "draft"));

        events.subscribe(Arc::new(MatchmakingSaga::new(
            scheduler.clone(),
            commands.clone(),
            session_links,
            options.roster,
            options.notifier,
            options.settings,
            options.timings,
        )));
        events.subscribe(Arc::new(GameSessionSaga::new(
            scheduler.clone(),
            commands.clone(),
            competition_links.clone(),
            draft_links.clone(),
            options.timings,
        )));
        events.subscribe(Arc::new(CompetitionFlowSaga::new(
            scheduler.clone(),
            commands.clone(),
            competition_links,
            options.timings,
        )));
        events.subscribe(Arc::new(DraftSaga::new(
            scheduler.clone(),
            commands.clone(),
            draft_links,
            options.timings,
        )));
        info!(sagas = events.subscriber_count(), "runtime wired");

        Ok(Self {
            events,
            commands,
            scheduler,
            matchmakings,
            drafts,
            sessions,
            competitions,
            archive,
            shutdown,
        })
    }

    /// Re-arms jobs left pending by a previous run.
    ///
    /// # Errors
    ///
    /// Returns the job store error if pending jobs cannot be read.
    pub async fn recover(&self) -> Result<usize, DomainError> {
        let armed = self.scheduler.recover().await?;
        info!(armed, "pending jobs recovered");
        Ok(armed)
    }

    /// Sends a command and waits for its handler.
    ///
    /// # Errors
    ///
    /// Returns the handler's error, or `DomainError::Configuration` if the
    /// command type has no handler.
    pub async fn send<C: Command>(&self, envelope: CommandEnvelope<C>) -> Result<C::Output, DomainError> {
        self.commands.send(envelope).await
    }

    /// Waits until no event is being dispatched and no job is pending,
    /// i.e. until the workflow can make no further progress on its own.
    ///
    /// # Errors
    ///
    /// Returns the job store error if pending jobs cannot be read.
    pub async fn settle(&self) -> Result<(), DomainError> {
        loop {
            self.events.wait_idle().await;
            self.scheduler.wait_idle().await;
            self.events.wait_idle().await;
            if self.scheduler.pending_jobs().await?.is_empty() {
                return Ok(());
            }
        }
    }

    /// Stops timers and event dispatch. Jobs that have not fired stay
    /// pending for the next [`Self::recover`].
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.scheduler.shutdown().await;
        self.events.shutdown().await;
        info!("runtime stopped");
    }
}
