//! End-to-end runs of the whole workflow on in-memory stores.

mod common;

use std::sync::Arc;

use common::{EventTap, fill_matchmaking, memory_stores, start_runtime};
use podium_competition::application::query_handlers::get_competition_results;
use podium_core::command::MessageContext;
use podium_session::application::query_handlers::get_game_session_by_id;

#[tokio::test(start_paused = true)]
async fn test_filled_matchmaking_runs_session_to_settlement() {
    // Arrange
    let runtime = start_runtime(memory_stores());
    let tap = Arc::new(EventTap::default());
    runtime.events.subscribe(tap.clone());
    let root = MessageContext::new_root();

    // Act
    let (_, players) = fill_matchmaking(&runtime, root).await;
    runtime.settle().await.unwrap();

    // Assert
    assert_eq!(tap.count("matchmaking.ended"), 1);
    assert_eq!(tap.count("session.created"), 1);
    assert_eq!(tap.count("competition.started"), 2);
    assert_eq!(tap.count("competition.next_round_started"), 1);
    assert_eq!(tap.count("competition.ended"), 2);
    assert_eq!(tap.count("draft.pick_made"), 4);
    assert_eq!(tap.count("draft.ended"), 1);
    assert_eq!(tap.count("session.ended"), 1);

    let session_id = tap.first("session.created").unwrap().aggregate_id;
    let view = get_game_session_by_id(session_id, &runtime.sessions)
        .await
        .unwrap();
    assert_eq!(view.phase, "ended");
    assert_eq!(view.players, players);
    assert_eq!(view.picks.len(), 4);
    let ranking = view.ranking.unwrap();
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].rank, 1);
    assert!(ranking[0].points >= ranking[1].points);

    assert!(runtime.scheduler.pending_jobs().await.unwrap().is_empty());
    assert!(runtime.scheduler.dead_letters().await.unwrap().is_empty());
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_every_event_carries_the_root_correlation() {
    // Arrange
    let runtime = start_runtime(memory_stores());
    let tap = Arc::new(EventTap::default());
    runtime.events.subscribe(tap.clone());
    let root = MessageContext::new_root();

    // Act
    fill_matchmaking(&runtime, root).await;
    runtime.settle().await.unwrap();

    // Assert
    let events = tap.events();
    assert!(events.len() > 20);
    assert!(
        events
            .iter()
            .all(|event| event.correlation_id == root.correlation_id)
    );
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_main_competition_results_are_archived_and_queryable() {
    // Arrange
    let runtime = start_runtime(memory_stores());
    let tap = Arc::new(EventTap::default());
    runtime.events.subscribe(tap.clone());

    // Act
    fill_matchmaking(&runtime, MessageContext::new_root()).await;
    runtime.settle().await.unwrap();

    // Assert
    let session_id = tap.first("session.created").unwrap().aggregate_id;
    let pre_draft = runtime.archive.load_existing(session_id, 0).await.unwrap();
    let main = runtime.archive.load_existing(session_id, 2).await.unwrap();
    assert_eq!(pre_draft.results.len(), 6);
    assert_ne!(pre_draft.competition_id, main.competition_id);
    let results = get_competition_results(main.competition_id, &runtime.competitions)
        .await
        .unwrap();
    assert_eq!(results.results, main.results);
    runtime.shutdown().await;
}
