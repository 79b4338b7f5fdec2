//! Shared fixtures for runtime tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use podium_competition::domain::config::CompetitionConfig;
use podium_core::bus::EventHandler;
use podium_core::command::{CommandEnvelope, MessageContext};
use podium_core::error::DomainError;
use podium_core::repository::StoredEvent;
use podium_matchmaking::domain::commands::{CreateMatchmaking, JoinMatchmaking};
use podium_orchestration::{PodiumRuntime, RuntimeOptions, RuntimeStores, SagaTimings};
use podium_session::application::roster::StaticCompetitorRoster;
use podium_session::domain::ranking::PointsTable;
use podium_session::domain::settings::GameSessionSettings;
use podium_store::{InMemoryEventRepository, InMemoryJobStore, InMemoryKeyValueStore};
use podium_test_support::FixedClock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub fn memory_stores() -> RuntimeStores {
    RuntimeStores {
        events: Arc::new(InMemoryEventRepository::new()),
        kv: Arc::new(InMemoryKeyValueStore::new()),
        jobs: Arc::new(InMemoryJobStore::new()),
    }
}

/// One observation competition, a two-pick draft and a two-round main event.
pub fn small_settings() -> GameSessionSettings {
    GameSessionSettings {
        pre_draft_competitions: vec![CompetitionConfig::single_round()],
        main_competition: CompetitionConfig::two_rounds(4),
        picks_per_player: 2,
        points_table: PointsTable::WorldCup,
    }
}

pub fn start_runtime(stores: RuntimeStores) -> PodiumRuntime {
    PodiumRuntime::start(
        stores,
        Arc::new(FixedClock::default()),
        RuntimeOptions {
            timings: SagaTimings::uniform(Duration::from_secs(1)),
            settings: small_settings(),
            roster: Arc::new(StaticCompetitorRoster::generated(6)),
            ..RuntimeOptions::default()
        },
        CancellationToken::new(),
    )
    .unwrap()
}

/// Opens a two-seat matchmaking and fills it, all under `root`.
pub async fn fill_matchmaking(runtime: &PodiumRuntime, root: MessageContext) -> (Uuid, Vec<Uuid>) {
    let matchmaking_id = Uuid::new_v4();
    runtime
        .send(CommandEnvelope::new(
            CreateMatchmaking {
                matchmaking_id,
                min_players: 2,
                max_players: 2,
            },
            root,
        ))
        .await
        .unwrap();
    let players = vec![Uuid::new_v4(), Uuid::new_v4()];
    for player_id in &players {
        runtime
            .send(CommandEnvelope::new(
                JoinMatchmaking {
                    matchmaking_id,
                    player_id: *player_id,
                },
                root.follow_up(),
            ))
            .await
            .unwrap();
    }
    (matchmaking_id, players)
}

/// Records every published event.
#[derive(Default)]
pub struct EventTap {
    events: Mutex<Vec<StoredEvent>>,
}

impl EventTap {
    pub fn events(&self) -> Vec<StoredEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }

    pub fn first(&self, event_type: &str) -> Option<StoredEvent> {
        self.events()
            .into_iter()
            .find(|event| event.event_type == event_type)
    }
}

#[async_trait]
impl EventHandler for EventTap {
    fn name(&self) -> &'static str {
        "event_tap"
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
