//! Provisioning-state store
//!
//! History is append-only: every run gets a record, later status changes
//! replace that run's record in place. The latest state is the last record.

use crate::error::StoreError;
use crate::snapshot;
use acs_model::ProvisioningState;
use parking_lot::RwLock;
use std::path::PathBuf;
use uuid::Uuid;

/// Store of provisioning run records
pub trait ProvisioningStateStore: Send + Sync {
    /// Most recent run, if any
    fn latest(&self) -> Result<Option<ProvisioningState>, StoreError>;

    /// All runs, oldest first
    fn history(&self) -> Result<Vec<ProvisioningState>, StoreError>;

    /// Append a new run or update an existing one by id
    fn save(&self, state: &ProvisioningState) -> Result<(), StoreError>;

    /// Record a new run in `Started` status
    fn start(&self, pending_profiles: Vec<String>) -> Result<ProvisioningState, StoreError> {
        let mut state = ProvisioningState::new(pending_profiles);
        state.start()?;
        self.save(&state)?;
        Ok(state)
    }

    /// Mark a started run `Completed`
    fn complete(&self, id: Uuid) -> Result<ProvisioningState, StoreError> {
        let mut state = self
            .history()?
            .into_iter()
            .find(|state| state.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "provisioning state",
                name: id.to_string(),
            })?;
        state.complete()?;
        self.save(&state)?;
        Ok(state)
    }
}

fn upsert(history: &mut Vec<ProvisioningState>, state: &ProvisioningState) {
    match history.iter_mut().find(|existing| existing.id == state.id) {
        Some(existing) => *existing = state.clone(),
        None => history.push(state.clone()),
    }
}

/// In-memory state store
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    history: RwLock<Vec<ProvisioningState>>,
}

impl InMemoryStateStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProvisioningStateStore for InMemoryStateStore {
    fn latest(&self) -> Result<Option<ProvisioningState>, StoreError> {
        Ok(self.history.read().last().cloned())
    }

    fn history(&self) -> Result<Vec<ProvisioningState>, StoreError> {
        Ok(self.history.read().clone())
    }

    fn save(&self, state: &ProvisioningState) -> Result<(), StoreError> {
        upsert(&mut self.history.write(), state);
        Ok(())
    }
}

/// State store persisted as a JSON snapshot
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    history: RwLock<Vec<ProvisioningState>>,
}

impl FileStateStore {
    /// Open the store at `path`, loading an existing snapshot
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let history = snapshot::load(&path)?;
        Ok(Self {
            path,
            history: RwLock::new(history),
        })
    }
}

impl ProvisioningStateStore for FileStateStore {
    fn latest(&self) -> Result<Option<ProvisioningState>, StoreError> {
        Ok(self.history.read().last().cloned())
    }

    fn history(&self) -> Result<Vec<ProvisioningState>, StoreError> {
        Ok(self.history.read().clone())
    }

    fn save(&self, state: &ProvisioningState) -> Result<(), StoreError> {
        let mut history = self.history.write();
        let mut next = history.clone();
        upsert(&mut next, state);
        snapshot::write(&self.path, &next)?;
        *history = next;
        Ok(())
    }
}
