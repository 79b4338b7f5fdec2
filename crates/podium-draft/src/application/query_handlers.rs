//! Query handlers for the draft context.

use podium_core::error::DomainError;
use podium_core::repository::AggregateRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Draft, DraftPhase};
use crate::domain::events::{NextPick, Pick};

/// Read-only view of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftView {
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Current phase.
    pub phase: DraftPhase,
    /// Picks made so far.
    pub picks: Vec<Pick>,
    /// The pick on the clock.
    pub next_pick: Option<NextPick>,
    /// Competitors still available.
    pub available: Vec<Uuid>,
    /// Stream version.
    pub version: i64,
}

/// Returns the current state of a draft.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if it does not exist.
pub async fn get_draft_by_id(
    draft_id: Uuid,
    repo: &AggregateRepository<Draft>,
) -> Result<DraftView, DomainError> {
    let loaded = repo.load_existing(draft_id).await?;
    let state = loaded.state;
    Ok(DraftView {
        draft_id,
        phase: state.phase,
        next_pick: state.next_pick(),
        available: state.available().iter().map(|c| c.competitor_id).collect(),
        picks: state.picks,
        version: loaded.version,
    })
}
