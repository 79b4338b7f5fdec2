//! Append-only child to owner lookups.
//!
//! One lookup per cross-aggregate link (matchmaking to session, draft to
//! session, competition to session). The saga that observes a child being
//! created records its owner; later sagas resolve the owner from it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use podium_core::error::DomainError;
use podium_core::kv::KeyValueStore;
use uuid::Uuid;

/// Outcome of an owner lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerLookupResult {
    /// The child is mapped to this owner.
    Found(Uuid),
    /// No mapping yet.
    NotFound,
}

/// Child to owner mapping for one link.
#[async_trait]
pub trait OwnerLookup: Send + Sync {
    /// Resolves the owner of `child_id`.
    async fn try_get_owner(&self, child_id: Uuid) -> Result<OwnerLookupResult, DomainError>;

    /// Records `owner_id` as the owner of `child_id`. Returns `true` when
    /// this call created the mapping; re-adding the same mapping returns
    /// `false`. Concurrent callers agree on a single owner.
    ///
    /// # Errors
    ///
    /// Implementations return `DomainError::PolicyViolation` when the child
    /// is already mapped to a different owner.
    async fn add_mapping(&self, child_id: Uuid, owner_id: Uuid) -> Result<bool, DomainError>;
}

fn remap_error(child_id: Uuid, existing: Uuid, owner_id: Uuid) -> DomainError {
    DomainError::PolicyViolation(format!(
        "{child_id} is owned by {existing}, cannot remap to {owner_id}"
    ))
}

/// Process-local lookup.
#[derive(Debug, Default)]
pub struct InMemoryOwnerLookup {
    owners: RwLock<HashMap<Uuid, Uuid>>,
}

impl InMemoryOwnerLookup {
    /// Creates an empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OwnerLookup for InMemoryOwnerLookup {
    async fn try_get_owner(&self, child_id: Uuid) -> Result<OwnerLookupResult, DomainError> {
        let owners = self
            .owners
            .read()
            .map_err(|e| DomainError::Infrastructure(format!("lookup lock poisoned: {e}")))?;
        Ok(owners
            .get(&child_id)
            .copied()
            .map_or(OwnerLookupResult::NotFound, OwnerLookupResult::Found))
    }

    async fn add_mapping(&self, child_id: Uuid, owner_id: Uuid) -> Result<bool, DomainError> {
        let mut owners = self
            .owners
            .write()
            .map_err(|e| DomainError::Infrastructure(format!("lookup lock poisoned: {e}")))?;
        match owners.get(&child_id) {
            Some(existing) if *existing == owner_id => Ok(false),
            Some(existing) => Err(remap_error(child_id, *existing, owner_id)),
            None => {
                owners.insert(child_id, owner_id);
                Ok(true)
            }
        }
    }
}

/// Lookup persisted in a key-value store under `lookup:{link}:{child}`.
#[derive(Clone)]
pub struct KvOwnerLookup {
    store: Arc<dyn KeyValueStore>,
    link: &'static str,
}

impl KvOwnerLookup {
    /// Creates a lookup for `link` (e.g. `"competition"`) over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, link: &'static str) -> Self {
        Self { store, link }
    }

    fn key(&self, child_id: Uuid) -> String {
        format!("lookup:{}:{child_id}", self.link)
    }
}

#[async_trait]
impl OwnerLookup for KvOwnerLookup {
    async fn try_get_owner(&self, child_id: Uuid) -> Result<OwnerLookupResult, DomainError> {
        let Some(bytes) = self.store.get(&self.key(child_id)).await? else {
            return Ok(OwnerLookupResult::NotFound);
        };
        let owner = Uuid::from_slice(&bytes)
            .map_err(|e| DomainError::Infrastructure(format!("corrupt lookup entry: {e}")))?;
        Ok(OwnerLookupResult::Found(owner))
    }

    async fn add_mapping(&self, child_id: Uuid, owner_id: Uuid) -> Result<bool, DomainError> {
        let written = self
            .store
            .set_if_absent(&self.key(child_id), owner_id.as_bytes().to_vec())
            .await?;
        if written {
            return Ok(true);
        }
        match self.try_get_owner(child_id).await? {
            OwnerLookupResult::Found(existing) if existing == owner_id => Ok(false),
            OwnerLookupResult::Found(existing) => Err(remap_error(child_id, existing, owner_id)),
            OwnerLookupResult::NotFound => Err(DomainError::Infrastructure(format!(
                "lookup entry for {child_id} was taken but cannot be read"
            ))),
        }
    }
}
