//! Augmentation phase
//!
//! Every augmentation referenced by an affected profile is registered with its
//! placeholders resolved. An augmentation whose last profile moved away is
//! deregistered and dropped from the effective table.

use super::PhaseSummary;
use crate::clients::AugmentationService;
use crate::error::ProvisionError;
use crate::retry::RetryPolicy;
use acs_model::{EffectiveAugmentation, PlaceholderResolver, ProfileDefinition, ValidationError};
use acs_store::{Dictionary, DictionaryStore, RuntimeStore};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub(crate) struct AugmentationPhase<'a> {
    pub(crate) dictionary: &'a Dictionary,
    pub(crate) runtime: &'a dyn RuntimeStore,
    pub(crate) resolver: &'a dyn PlaceholderResolver,
    pub(crate) service: &'a dyn AugmentationService,
    pub(crate) policy: &'a RetryPolicy,
}

impl AugmentationPhase<'_> {
    pub(crate) async fn run(
        &self,
        profiles: &[ProfileDefinition],
    ) -> Result<PhaseSummary, ProvisionError> {
        let affected: BTreeSet<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        let mut desired: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut touched = BTreeSet::new();

        // affected profiles are re-attached below from their current definition
        for effective in self.runtime.effective_augmentations()? {
            let (moved, kept): (BTreeSet<String>, BTreeSet<String>) = effective
                .profiles
                .into_iter()
                .partition(|profile| affected.contains(profile.as_str()));
            if !moved.is_empty() {
                touched.insert(effective.definition.name.clone());
            }
            desired.insert(effective.definition.name, kept);
        }
        for profile in profiles {
            if let Some(name) = &profile.augmentation {
                touched.insert(name.clone());
                desired
                    .entry(name.clone())
                    .or_default()
                    .insert(profile.name.clone());
            }
        }

        let mut summary = PhaseSummary::default();
        let (register, deregister): (Vec<_>, Vec<_>) = touched
            .into_iter()
            .map(|name| {
                let users = desired.remove(&name).unwrap_or_default();
                (name, users)
            })
            .partition(|(_, users)| !users.is_empty());

        for (name, users) in register {
            self.register(&name, users, &mut summary).await?;
        }
        for (name, _) in deregister {
            self.deregister(&name, &mut summary).await?;
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            deleted = summary.deleted,
            "augmentations provisioned"
        );
        Ok(summary)
    }

    async fn register(
        &self,
        name: &str,
        profiles: BTreeSet<String>,
        summary: &mut PhaseSummary,
    ) -> Result<(), ProvisionError> {
        let definition = self
            .dictionary
            .augmentations
            .get(name)?
            .ok_or_else(|| {
                ValidationError::invalid(name, "augmentation is referenced but not defined")
            })?
            .resolved(self.resolver);

        let registered = match self
            .policy
            .run("augmentation.get", |_| self.service.get_by_id(name))
            .await
        {
            Ok(registered) => Some(registered),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        match registered {
            None => {
                self.policy
                    .run("augmentation.create", |_| self.service.create(&definition))
                    .await?;
                info!(augmentation = name, url = %definition.url, "augmentation registered");
                summary.created += 1;
            }
            Some(registered) if registered == definition => {
                debug!(augmentation = name, "augmentation unchanged");
                summary.unchanged += 1;
            }
            Some(_) => {
                self.policy
                    .run("augmentation.update", |_| self.service.update(&definition))
                    .await?;
                info!(augmentation = name, url = %definition.url, "augmentation updated");
                summary.updated += 1;
            }
        }

        self.runtime
            .save_effective_augmentation(&EffectiveAugmentation::new(definition, profiles))?;
        Ok(())
    }

    async fn deregister(&self, name: &str, summary: &mut PhaseSummary) -> Result<(), ProvisionError> {
        match self
            .policy
            .run("augmentation.delete", |_| self.service.delete(name))
            .await
        {
            Ok(()) => {
                info!(augmentation = name, "augmentation deregistered");
                summary.deleted += 1;
            }
            Err(err) if err.is_not_found() => {
                debug!(augmentation = name, "augmentation already deregistered");
            }
            Err(err) => return Err(err.into()),
        }
        self.runtime.remove_effective_augmentation(name)?;
        Ok(())
    }
}
