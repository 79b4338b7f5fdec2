//! Event to command translators.

pub mod competition;
pub mod draft;
pub mod matchmaking;
pub mod session;

use std::time::Duration;

use podium_core::command::{CommandEnvelope, MessageContext};
use podium_core::error::DomainError;
use podium_core::repository::StoredEvent;
use podium_scheduler::{ScheduledCommand, Scheduler};
use tracing::debug;

pub use competition::CompetitionFlowSaga;
pub use draft::DraftSaga;
pub use matchmaking::MatchmakingSaga;
pub use session::GameSessionSaga;

/// Schedules `command` in reaction to `event`, `delay` from now, under the
/// idempotency key `unique_key`.
async fn schedule_caused_by<C: ScheduledCommand>(
    scheduler: &Scheduler,
    event: &StoredEvent,
    command: C,
    delay: Duration,
    unique_key: String,
) -> Result<(), DomainError> {
    let envelope = CommandEnvelope::new(command, MessageContext::caused_by(event));
    let outcome = scheduler
        .schedule_command_in(envelope, delay, Some(unique_key.clone()))
        .await?;
    if !outcome.is_accepted() {
        debug!(key = %unique_key, "already scheduled");
    }
    Ok(())
}
