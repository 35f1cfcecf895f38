//! Dictionary store: the declared definitions
//!
//! Provides:
//! - [`DictionaryStore`]: name-keyed store of one definition category
//! - [`InMemoryDictionary`] and [`FileDictionary`] implementations
//! - [`Dictionary`]: one store per submission category, persisted together

use crate::error::StoreError;
use crate::snapshot;
use acs_model::{
    AugmentationDefinition, Definition, DefinitionKey, KpiDefinition, PmDefinition,
    PmSchemaDefinition, ProfileDefinition, ResourceSubmission,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name-keyed store of one definition category
pub trait DictionaryStore<T: Definition>: Send + Sync {
    /// Look up a definition by name
    fn get(&self, name: &str) -> Result<Option<T>, StoreError>;

    /// All definitions, ordered by name
    fn all(&self) -> Result<Vec<T>, StoreError>;

    /// Insert or replace definitions by name
    fn save_all(&self, definitions: &[T]) -> Result<(), StoreError>;

    /// Insert or replace one definition
    fn save(&self, definition: &T) -> Result<(), StoreError> {
        self.save_all(std::slice::from_ref(definition))
    }

    /// True if a structurally equal definition is stored under the same name
    fn is_matched(&self, definition: &T) -> Result<bool, StoreError> {
        Ok(self.get(definition.name())?.as_ref() == Some(definition))
    }

    /// Stored definitions depending (one hop) on any of the changed keys
    fn find_affected(&self, changed: &BTreeSet<DefinitionKey>) -> Result<Vec<T>, StoreError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|definition| {
                definition
                    .dependencies()
                    .iter()
                    .any(|dependency| changed.contains(dependency))
            })
            .collect())
    }
}

/// In-memory dictionary store
#[derive(Debug)]
pub struct InMemoryDictionary<T> {
    entries: RwLock<BTreeMap<String, T>>,
}

impl<T: Definition> InMemoryDictionary<T> {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create store seeded with definitions
    #[must_use]
    pub fn with_entries(definitions: impl IntoIterator<Item = T>) -> Self {
        let entries = definitions
            .into_iter()
            .map(|definition| (definition.name().to_string(), definition))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Number of stored definitions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T: Definition> Default for InMemoryDictionary<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Definition> DictionaryStore<T> for InMemoryDictionary<T> {
    fn get(&self, name: &str) -> Result<Option<T>, StoreError> {
        Ok(self.entries.read().get(name).cloned())
    }

    fn all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn save_all(&self, definitions: &[T]) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        for definition in definitions {
            entries.insert(definition.name().to_string(), definition.clone());
        }
        Ok(())
    }
}

/// Dictionary store persisted as a JSON snapshot
#[derive(Debug)]
pub struct FileDictionary<T> {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, T>>,
}

impl<T: Definition> FileDictionary<T> {
    /// Open the store at `path`, loading an existing snapshot
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = snapshot::load(&path)?;
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Snapshot location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Definition> DictionaryStore<T> for FileDictionary<T> {
    fn get(&self, name: &str) -> Result<Option<T>, StoreError> {
        Ok(self.entries.read().get(name).cloned())
    }

    fn all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn save_all(&self, definitions: &[T]) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        for definition in definitions {
            next.insert(definition.name().to_string(), definition.clone());
        }
        snapshot::write(&self.path, &next)?;
        *entries = next;
        Ok(())
    }
}

/// One dictionary store per submission category
#[derive(Clone)]
pub struct Dictionary {
    /// PM definitions (explicit and lifted from schemas)
    pub pm_defs: Arc<dyn DictionaryStore<PmDefinition>>,
    /// KPI definitions
    pub kpi_defs: Arc<dyn DictionaryStore<KpiDefinition>>,
    /// Profile definitions
    pub profiles: Arc<dyn DictionaryStore<ProfileDefinition>>,
    /// Augmentation definitions, as submitted
    pub augmentations: Arc<dyn DictionaryStore<AugmentationDefinition>>,
    /// PM schema definitions
    pub pm_schemas: Arc<dyn DictionaryStore<PmSchemaDefinition>>,
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary").finish_non_exhaustive()
    }
}

impl Dictionary {
    /// Empty in-memory dictionary
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            pm_defs: Arc::new(InMemoryDictionary::new()),
            kpi_defs: Arc::new(InMemoryDictionary::new()),
            profiles: Arc::new(InMemoryDictionary::new()),
            augmentations: Arc::new(InMemoryDictionary::new()),
            pm_schemas: Arc::new(InMemoryDictionary::new()),
        }
    }

    /// File-backed dictionary with one snapshot per category under `dir`
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            pm_defs: Arc::new(FileDictionary::open(dir.join("pm_defs.json"))?),
            kpi_defs: Arc::new(FileDictionary::open(dir.join("kpi_defs.json"))?),
            profiles: Arc::new(FileDictionary::open(dir.join("profiles.json"))?),
            augmentations: Arc::new(FileDictionary::open(dir.join("augmentations.json"))?),
            pm_schemas: Arc::new(FileDictionary::open(dir.join("pm_schemas.json"))?),
        })
    }

    /// Detached in-memory copy, for planning without touching the backing stores
    pub fn to_in_memory(&self) -> Result<Self, StoreError> {
        Ok(Self {
            pm_defs: Arc::new(InMemoryDictionary::with_entries(self.pm_defs.all()?)),
            kpi_defs: Arc::new(InMemoryDictionary::with_entries(self.kpi_defs.all()?)),
            profiles: Arc::new(InMemoryDictionary::with_entries(self.profiles.all()?)),
            augmentations: Arc::new(InMemoryDictionary::with_entries(self.augmentations.all()?)),
            pm_schemas: Arc::new(InMemoryDictionary::with_entries(self.pm_schemas.all()?)),
        })
    }

    /// Save every present category of a submission (lifted PMs included)
    pub fn persist(&self, submission: &ResourceSubmission) -> Result<(), StoreError> {
        let pm_defs = submission.effective_pm_definitions();
        if !pm_defs.is_empty() {
            self.pm_defs.save_all(&pm_defs)?;
        }
        if !submission.pm_schemas.is_empty() {
            self.pm_schemas.save_all(&submission.pm_schemas)?;
        }
        if !submission.kpi_defs.is_empty() {
            self.kpi_defs.save_all(&submission.kpi_defs)?;
        }
        if !submission.profile_defs.is_empty() {
            self.profiles.save_all(&submission.profile_defs)?;
        }
        if !submission.augmentations.is_empty() {
            self.augmentations.save_all(&submission.augmentations)?;
        }
        tracing::debug!(
            pm_defs = pm_defs.len(),
            kpi_defs = submission.kpi_defs.len(),
            profiles = submission.profile_defs.len(),
            augmentations = submission.augmentations.len(),
            pm_schemas = submission.pm_schemas.len(),
            "dictionary persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acs_model::{DefinitionKind, InputMetric, PmCounter};
    use pretty_assertions::assert_eq;

    fn kpi(name: &str, input: InputMetric) -> KpiDefinition {
        KpiDefinition::new(name, "SUM(a)", "SUM").with_input(input)
    }

    #[test]
    fn is_matched_compares_structurally() {
        let store = InMemoryDictionary::new();
        let original = kpi("k", InputMetric::pm("pm.a", "a"));
        assert!(!store.is_matched(&original).unwrap());

        store.save(&original).unwrap();
        assert!(store.is_matched(&original).unwrap());

        let changed = original.clone().with_display_name("K");
        assert!(!store.is_matched(&changed).unwrap());
    }

    #[test]
    fn find_affected_follows_one_hop() {
        let store = InMemoryDictionary::with_entries([
            kpi("simple", InputMetric::pm("pm.a", "a")),
            kpi("complex", InputMetric::kpi("simple", "a")),
            kpi("other", InputMetric::pm("pm.b", "a")),
        ]);
        let changed = BTreeSet::from([DefinitionKey::new(DefinitionKind::PmDefinition, "pm.a")]);

        let names: Vec<String> = store
            .find_affected(&changed)
            .unwrap()
            .into_iter()
            .map(|k| k.name)
            .collect();
        assert_eq!(names, vec!["simple"]);
    }

    #[test]
    fn file_dictionary_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kpis.json");
        let definition = kpi("k", InputMetric::pm("pm.a", "a"));

        FileDictionary::open(&path).unwrap().save(&definition).unwrap();

        let reopened = FileDictionary::<KpiDefinition>::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap(), Some(definition));
    }

    #[test]
    fn persist_saves_lifted_pm_definitions() {
        let dictionary = Dictionary::in_memory();
        let submission = ResourceSubmission::new().with_pm_schema(
            PmSchemaDefinition::new("smf", "5G|PM|smf", vec!["nf".into()])
                .with_counter(PmCounter::new("pm.a")),
        );

        dictionary.persist(&submission).unwrap();

        assert!(dictionary.pm_defs.get("pm.a").unwrap().is_some());
        assert!(dictionary.pm_schemas.get("smf").unwrap().is_some());
        assert!(dictionary.kpi_defs.all().unwrap().is_empty());
    }

    #[test]
    fn in_memory_copy_is_detached() {
        let dictionary = Dictionary::in_memory();
        dictionary.kpi_defs.save(&kpi("k", InputMetric::pm("pm.a", "a"))).unwrap();

        let scratch = dictionary.to_in_memory().unwrap();
        scratch.kpi_defs.save(&kpi("extra", InputMetric::pm("pm.b", "b"))).unwrap();

        assert_eq!(scratch.kpi_defs.all().unwrap().len(), 2);
        assert_eq!(dictionary.kpi_defs.all().unwrap().len(), 1);
    }
}
