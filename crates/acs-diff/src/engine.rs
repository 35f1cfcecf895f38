//! Diff engine
//!
//! Compares a submission against the dictionary and the runtime store.
//!
//! # Change rules
//! - PM, KPI, profile and PM-schema entries: changed when missing from the
//!   dictionary or structurally different
//! - PM schemas also contribute the PM definitions lifted from their counters
//! - Augmentations: URL placeholders are resolved first, then compared with
//!   the effective augmentation when one is recorded, else with the
//!   dictionary entry resolved the same way
//!
//! # Affected profiles
//! Changed keys are widened to a fixpoint through KPI input metrics, one hop
//! per round. A profile is affected when it changed itself or depends on any
//! key in the widened set. Submitted versions of KPIs and profiles are used
//! in place of stored ones.

use crate::error::DiffError;
use acs_model::{
    Definition, DefinitionKey, KpiDefinition, PlaceholderResolver, ProfileDefinition,
    ResourceSubmission,
};
use acs_store::{Dictionary, DictionaryStore, InMemoryDictionary, RuntimeStore};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Change detector over the dictionary and runtime stores
#[derive(Clone)]
pub struct DiffEngine {
    dictionary: Dictionary,
    runtime: Arc<dyn RuntimeStore>,
    resolver: Arc<dyn PlaceholderResolver>,
}

impl std::fmt::Debug for DiffEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffEngine")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// Stored definitions overlaid with submitted ones (submitted win by name)
fn overlay<T: Definition>(stored: Vec<T>, submitted: &[T]) -> InMemoryDictionary<T> {
    let mut merged: BTreeMap<String, T> = stored
        .into_iter()
        .map(|definition| (definition.name().to_string(), definition))
        .collect();
    for definition in submitted {
        merged.insert(definition.name().to_string(), definition.clone());
    }
    InMemoryDictionary::with_entries(merged.into_values())
}

fn changed_entries<T: Definition>(
    store: &dyn DictionaryStore<T>,
    entries: &[T],
    changed: &mut BTreeSet<DefinitionKey>,
) -> Result<(), DiffError> {
    for entry in entries {
        if !store.is_matched(entry)? {
            changed.insert(entry.key());
        }
    }
    Ok(())
}

impl DiffEngine {
    /// Create new engine
    #[must_use]
    pub fn new(
        dictionary: Dictionary,
        runtime: Arc<dyn RuntimeStore>,
        resolver: Arc<dyn PlaceholderResolver>,
    ) -> Self {
        Self {
            dictionary,
            runtime,
            resolver,
        }
    }

    /// True if any present entry of the submission differs from stored state
    ///
    /// # Errors
    /// `DiffError::Store` when a store lookup fails
    pub fn is_changed(&self, submission: &ResourceSubmission) -> Result<bool, DiffError> {
        Ok(!self.changed_keys(submission)?.is_empty())
    }

    /// Keys of every submitted entry that differs from stored state
    ///
    /// # Errors
    /// `DiffError::Store` when a store lookup fails
    pub fn changed_keys(
        &self,
        submission: &ResourceSubmission,
    ) -> Result<BTreeSet<DefinitionKey>, DiffError> {
        let mut changed = BTreeSet::new();
        changed_entries(
            self.dictionary.pm_defs.as_ref(),
            &submission.effective_pm_definitions(),
            &mut changed,
        )?;
        changed_entries(
            self.dictionary.pm_schemas.as_ref(),
            &submission.pm_schemas,
            &mut changed,
        )?;
        changed_entries(
            self.dictionary.kpi_defs.as_ref(),
            &submission.kpi_defs,
            &mut changed,
        )?;
        changed_entries(
            self.dictionary.profiles.as_ref(),
            &submission.profile_defs,
            &mut changed,
        )?;

        for augmentation in &submission.augmentations {
            let resolved = augmentation.resolved(self.resolver.as_ref());
            let current = match self.runtime.effective_augmentation(&augmentation.name)? {
                Some(effective) => Some(effective.definition),
                None => self
                    .dictionary
                    .augmentations
                    .get(&augmentation.name)?
                    .map(|stored| stored.resolved(self.resolver.as_ref())),
            };
            if current.as_ref() != Some(&resolved) {
                changed.insert(augmentation.key());
            }
        }

        debug!(changed = changed.len(), "submission diffed");
        Ok(changed)
    }

    /// Profiles that must be re-provisioned for this submission, sorted by name
    ///
    /// # Errors
    /// `DiffError::Store` when a store lookup fails
    pub fn affected_profiles(
        &self,
        submission: &ResourceSubmission,
    ) -> Result<Vec<ProfileDefinition>, DiffError> {
        if submission.is_empty() {
            return Ok(Vec::new());
        }
        let changed = self.changed_keys(submission)?;
        if changed.is_empty() {
            return Ok(Vec::new());
        }

        let kpis: InMemoryDictionary<KpiDefinition> =
            overlay(self.dictionary.kpi_defs.all()?, &submission.kpi_defs);
        let widened = Self::widen(&kpis, changed)?;

        let profiles = overlay(self.dictionary.profiles.all()?, &submission.profile_defs);
        let mut affected: BTreeMap<String, ProfileDefinition> = profiles
            .find_affected(&widened)?
            .into_iter()
            .map(|profile| (profile.name.clone(), profile))
            .collect();
        for profile in profiles.all()? {
            if widened.contains(&profile.key()) {
                affected.insert(profile.name.clone(), profile);
            }
        }

        debug!(
            keys = widened.len(),
            profiles = affected.len(),
            "affected profiles computed"
        );
        Ok(affected.into_values().collect())
    }

    /// Add KPIs depending on changed keys until nothing new is found
    fn widen(
        kpis: &InMemoryDictionary<KpiDefinition>,
        mut keys: BTreeSet<DefinitionKey>,
    ) -> Result<BTreeSet<DefinitionKey>, DiffError> {
        loop {
            let before = keys.len();
            let next: Vec<DefinitionKey> = kpis
                .find_affected(&keys)?
                .iter()
                .map(Definition::key)
                .collect();
            keys.extend(next);
            if keys.len() == before {
                return Ok(keys);
            }
        }
    }
}
