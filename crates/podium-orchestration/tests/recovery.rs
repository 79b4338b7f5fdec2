//! Restarting a runtime over the same stores resumes the workflow.

mod common;

use std::sync::Arc;

use common::{EventTap, fill_matchmaking, memory_stores, start_runtime};
use podium_core::command::MessageContext;
use podium_session::application::query_handlers::get_game_session_by_id;

#[tokio::test(start_paused = true)]
async fn test_restarted_runtime_finishes_interrupted_session() {
    // Arrange
    let stores = memory_stores();
    let first = start_runtime(stores.clone());
    let tap = Arc::new(EventTap::default());
    first.events.subscribe(tap.clone());
    fill_matchmaking(&first, MessageContext::new_root()).await;
    first.events.wait_idle().await;
    let session_id = tap.first("session.created").unwrap().aggregate_id;
    let interrupted = first.scheduler.pending_jobs().await.unwrap();
    assert!(!interrupted.is_empty());
    first.shutdown().await;

    // Act
    let second = start_runtime(stores);
    let armed = second.recover().await.unwrap();
    second.settle().await.unwrap();

    // Assert
    assert_eq!(armed, interrupted.len());
    let view = get_game_session_by_id(session_id, &second.sessions)
        .await
        .unwrap();
    assert_eq!(view.phase, "ended");
    assert_eq!(view.ranking.map(|ranking| ranking.len()), Some(2));
    assert!(second.scheduler.dead_letters().await.unwrap().is_empty());
    second.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_keeps_unfired_jobs_pending() {
    // Arrange
    let stores = memory_stores();
    let runtime = start_runtime(stores.clone());
    fill_matchmaking(&runtime, MessageContext::new_root()).await;
    runtime.events.wait_idle().await;
    let before = runtime.scheduler.pending_jobs().await.unwrap();

    // Act
    runtime.shutdown().await;

    // Assert
    let after = stores.jobs.pending().await.unwrap();
    assert_eq!(after.len(), before.len());
}
