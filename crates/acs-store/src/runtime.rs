//! Runtime store: what is deployed downstream
//!
//! Holds deployed KPIs (by deployed name), the effective augmentation table
//! and index definitions.

use crate::error::StoreError;
use crate::snapshot;
use acs_model::{DeployedKpi, EffectiveAugmentation, IndexDefinition, KpiIdentity};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Store of deployed artifacts
pub trait RuntimeStore: Send + Sync {
    /// Deployed KPI with the given dedup identity
    fn find_kpi(&self, identity: &KpiIdentity) -> Result<Option<DeployedKpi>, StoreError>;

    /// Deployed KPIs compiled from a source KPI
    fn kpis_for_source(&self, source_kpi: &str) -> Result<Vec<DeployedKpi>, StoreError>;

    /// All deployed KPIs, ordered by deployed name
    fn all_kpis(&self) -> Result<Vec<DeployedKpi>, StoreError>;

    /// Create or update deployed KPIs by name
    fn save_kpis(&self, kpis: &[DeployedKpi]) -> Result<(), StoreError>;

    /// Effective augmentation by name
    fn effective_augmentation(&self, name: &str)
        -> Result<Option<EffectiveAugmentation>, StoreError>;

    /// All effective augmentations
    fn effective_augmentations(&self) -> Result<Vec<EffectiveAugmentation>, StoreError>;

    /// Create or replace an effective augmentation
    fn save_effective_augmentation(
        &self,
        augmentation: &EffectiveAugmentation,
    ) -> Result<(), StoreError>;

    /// Remove an effective augmentation; returns whether it existed
    fn remove_effective_augmentation(&self, name: &str) -> Result<bool, StoreError>;

    /// Index definition by name
    fn index(&self, name: &str) -> Result<Option<IndexDefinition>, StoreError>;

    /// Create or replace an index definition
    fn save_index(&self, index: &IndexDefinition) -> Result<(), StoreError>;
}

/// Full content of a runtime store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    /// Deployed KPIs by deployed name
    #[serde(default)]
    pub kpis: BTreeMap<String, DeployedKpi>,
    /// Effective augmentations by name
    #[serde(default)]
    pub augmentations: BTreeMap<String, EffectiveAugmentation>,
    /// Index definitions by name
    #[serde(default)]
    pub indexes: BTreeMap<String, IndexDefinition>,
}

impl RuntimeSnapshot {
    fn find_kpi(&self, identity: &KpiIdentity) -> Option<DeployedKpi> {
        self.kpis
            .values()
            .find(|kpi| kpi.source_kpi == identity.source_kpi && &kpi.identity() == identity)
            .cloned()
    }

    fn kpis_for_source(&self, source_kpi: &str) -> Vec<DeployedKpi> {
        self.kpis
            .values()
            .filter(|kpi| kpi.source_kpi == source_kpi)
            .cloned()
            .collect()
    }
}

/// In-memory runtime store
#[derive(Debug, Default)]
pub struct InMemoryRuntimeStore {
    inner: RwLock<RuntimeSnapshot>,
}

impl InMemoryRuntimeStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current content
    #[must_use]
    pub fn snapshot(&self) -> RuntimeSnapshot {
        self.inner.read().clone()
    }
}

impl RuntimeStore for InMemoryRuntimeStore {
    fn find_kpi(&self, identity: &KpiIdentity) -> Result<Option<DeployedKpi>, StoreError> {
        Ok(self.inner.read().find_kpi(identity))
    }

    fn kpis_for_source(&self, source_kpi: &str) -> Result<Vec<DeployedKpi>, StoreError> {
        Ok(self.inner.read().kpis_for_source(source_kpi))
    }

    fn all_kpis(&self) -> Result<Vec<DeployedKpi>, StoreError> {
        Ok(self.inner.read().kpis.values().cloned().collect())
    }

    fn save_kpis(&self, kpis: &[DeployedKpi]) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        for kpi in kpis {
            inner.kpis.insert(kpi.name.clone(), kpi.clone());
        }
        Ok(())
    }

    fn effective_augmentation(
        &self,
        name: &str,
    ) -> Result<Option<EffectiveAugmentation>, StoreError> {
        Ok(self.inner.read().augmentations.get(name).cloned())
    }

    fn effective_augmentations(&self) -> Result<Vec<EffectiveAugmentation>, StoreError> {
        Ok(self.inner.read().augmentations.values().cloned().collect())
    }

    fn save_effective_augmentation(
        &self,
        augmentation: &EffectiveAugmentation,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .augmentations
            .insert(augmentation.name().to_string(), augmentation.clone());
        Ok(())
    }

    fn remove_effective_augmentation(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().augmentations.remove(name).is_some())
    }

    fn index(&self, name: &str) -> Result<Option<IndexDefinition>, StoreError> {
        Ok(self.inner.read().indexes.get(name).cloned())
    }

    fn save_index(&self, index: &IndexDefinition) -> Result<(), StoreError> {
        self.inner
            .write()
            .indexes
            .insert(index.name.clone(), index.clone());
        Ok(())
    }
}

/// Runtime store persisted as a single JSON snapshot
#[derive(Debug)]
pub struct FileRuntimeStore {
    path: PathBuf,
    inner: RwLock<RuntimeSnapshot>,
}

impl FileRuntimeStore {
    /// Open the store at `path`, loading an existing snapshot
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let inner = snapshot::load(&path)?;
        Ok(Self {
            path,
            inner: RwLock::new(inner),
        })
    }

    /// Apply a mutation, write the snapshot, then publish it
    fn mutate<R>(&self, apply: impl FnOnce(&mut RuntimeSnapshot) -> R) -> Result<R, StoreError> {
        let mut inner = self.inner.write();
        let mut next = inner.clone();
        let result = apply(&mut next);
        snapshot::write(&self.path, &next)?;
        *inner = next;
        Ok(result)
    }
}

impl RuntimeStore for FileRuntimeStore {
    fn find_kpi(&self, identity: &KpiIdentity) -> Result<Option<DeployedKpi>, StoreError> {
        Ok(self.inner.read().find_kpi(identity))
    }

    fn kpis_for_source(&self, source_kpi: &str) -> Result<Vec<DeployedKpi>, StoreError> {
        Ok(self.inner.read().kpis_for_source(source_kpi))
    }

    fn all_kpis(&self) -> Result<Vec<DeployedKpi>, StoreError> {
        Ok(self.inner.read().kpis.values().cloned().collect())
    }

    fn save_kpis(&self, kpis: &[DeployedKpi]) -> Result<(), StoreError> {
        self.mutate(|snapshot| {
            for kpi in kpis {
                snapshot.kpis.insert(kpi.name.clone(), kpi.clone());
            }
        })
    }

    fn effective_augmentation(
        &self,
        name: &str,
    ) -> Result<Option<EffectiveAugmentation>, StoreError> {
        Ok(self.inner.read().augmentations.get(name).cloned())
    }

    fn effective_augmentations(&self) -> Result<Vec<EffectiveAugmentation>, StoreError> {
        Ok(self.inner.read().augmentations.values().cloned().collect())
    }

    fn save_effective_augmentation(
        &self,
        augmentation: &EffectiveAugmentation,
    ) -> Result<(), StoreError> {
        self.mutate(|snapshot| {
            snapshot
                .augmentations
                .insert(augmentation.name().to_string(), augmentation.clone());
        })
    }

    fn remove_effective_augmentation(&self, name: &str) -> Result<bool, StoreError> {
        self.mutate(|snapshot| snapshot.augmentations.remove(name).is_some())
    }

    fn index(&self, name: &str) -> Result<Option<IndexDefinition>, StoreError> {
        Ok(self.inner.read().indexes.get(name).cloned())
    }

    fn save_index(&self, index: &IndexDefinition) -> Result<(), StoreError> {
        self.mutate(|snapshot| {
            snapshot.indexes.insert(index.name.clone(), index.clone());
        })
    }
}
