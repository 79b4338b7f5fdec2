//! Demo bootstrap: opens a matchmaking and fills it with generated players.

use podium_core::command::{CommandEnvelope, MessageContext};
use podium_matchmaking::domain::commands::{CreateMatchmaking, JoinMatchmaking};
use podium_orchestration::PodiumRuntime;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;

/// Opens a matchmaking for `players` seats and joins that many players, all
/// under one correlation. The full matchmaking closes itself and the sagas
/// take over from there.
///
/// # Errors
///
/// Returns `AppError::Domain` if a command fails.
pub async fn demo_matchmaking(runtime: &PodiumRuntime, players: u32) -> Result<Uuid, AppError> {
    let root = MessageContext::new_root();
    let matchmaking_id = Uuid::new_v4();
    runtime
        .send(CommandEnvelope::new(
            CreateMatchmaking {
                matchmaking_id,
                min_players: players,
                max_players: players,
            },
            root,
        ))
        .await?;
    for _ in 0..players {
        runtime
            .send(CommandEnvelope::new(
                JoinMatchmaking {
                    matchmaking_id,
                    player_id: Uuid::new_v4(),
                },
                root.follow_up(),
            ))
            .await?;
    }
    info!(%matchmaking_id, players, correlation_id = %root.correlation_id, "demo matchmaking filled");
    Ok(matchmaking_id)
}
