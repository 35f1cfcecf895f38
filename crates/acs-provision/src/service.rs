//! Submission entry point
//!
//! Validates a submission, works out which profiles it affects, persists it
//! and hands the affected profiles to the orchestrator. A run left unfinished
//! by an earlier failure is resumed: its pending profiles join the next
//! submission even when that submission changes nothing.

use crate::error::ProvisionError;
use crate::orchestrator::{ProvisioningOrchestrator, ProvisioningReport};
use acs_compiler::CompilationResult;
use acs_diff::DiffEngine;
use acs_model::{ProfileDefinition, ResourceSubmission};
use acs_store::{Dictionary, DictionaryStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// What a dry run would provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Affected profiles, sorted
    pub profiles: Vec<String>,
    /// Compiled KPIs with their required action
    pub compilation: CompilationResult,
}

/// Result of [`ProvisioningService::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Nothing changed and no run was pending
    Unchanged,
    /// Definitions changed and were stored, but no profile uses them yet
    Stored,
    /// Dry run: compiled, nothing persisted or sent downstream
    Planned(Plan),
    /// Provisioned downstream
    Provisioned(ProvisioningReport),
}

/// Profiles to provision and whether the submission was persisted
struct Affected {
    stored: bool,
    profiles: Vec<ProfileDefinition>,
}

/// Facade over diffing, persistence and orchestration
#[derive(Debug)]
pub struct ProvisioningService {
    orchestrator: ProvisioningOrchestrator,
    diff: DiffEngine,
}

impl ProvisioningService {
    /// Create service around an orchestrator
    #[must_use]
    pub fn new(orchestrator: ProvisioningOrchestrator) -> Self {
        let stores = orchestrator.stores();
        let diff = DiffEngine::new(
            stores.dictionary.clone(),
            Arc::clone(&stores.runtime),
            orchestrator.resolver(),
        );
        Self { orchestrator, diff }
    }

    /// Underlying orchestrator
    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &ProvisioningOrchestrator {
        &self.orchestrator
    }

    /// Validate, diff, persist and provision a submission
    ///
    /// In dry-run mode this behaves like [`plan`](Self::plan).
    ///
    /// # Errors
    /// Validation, store, compilation or phase failures
    pub async fn submit(
        &self,
        submission: &ResourceSubmission,
    ) -> Result<SubmissionOutcome, ProvisionError> {
        if self.orchestrator.is_dry_run() {
            let plan = self.plan(submission)?;
            return Ok(if plan.profiles.is_empty() {
                SubmissionOutcome::Unchanged
            } else {
                SubmissionOutcome::Planned(plan)
            });
        }

        submission.validate()?;
        let Affected { stored, profiles } =
            self.affected(submission, &self.orchestrator.stores().dictionary)?;
        if profiles.is_empty() {
            return Ok(if stored {
                info!("definitions stored, no profile affected");
                SubmissionOutcome::Stored
            } else {
                info!("submission unchanged, nothing to provision");
                SubmissionOutcome::Unchanged
            });
        }

        let report = self.orchestrator.provision(&profiles).await?;
        Ok(SubmissionOutcome::Provisioned(report))
    }

    /// Compile what a submission would provision without persisting anything
    ///
    /// # Errors
    /// Validation, store or compilation failures
    pub fn plan(&self, submission: &ResourceSubmission) -> Result<Plan, ProvisionError> {
        submission.validate()?;
        let scratch = self.orchestrator.stores().dictionary.to_in_memory()?;
        let Affected { profiles, .. } = self.affected(submission, &scratch)?;
        let compilation = if profiles.is_empty() {
            CompilationResult::default()
        } else {
            self.orchestrator
                .compiler(scratch)
                .calculate_affected_kpis(&profiles)?
        };
        Ok(Plan {
            profiles: profiles.into_iter().map(|profile| profile.name).collect(),
            compilation,
        })
    }

    /// Affected profiles plus those of an unfinished run, sorted by name
    ///
    /// Persists the submission into `target` whenever it changes a definition,
    /// whether or not a profile is affected.
    fn affected(
        &self,
        submission: &ResourceSubmission,
        target: &Dictionary,
    ) -> Result<Affected, ProvisionError> {
        let resumed = match self.orchestrator.stores().state.latest()? {
            Some(state) if state.is_unfinished() => {
                info!(
                    run = %state.id,
                    pending = state.pending_profiles.len(),
                    "resuming unfinished provisioning run"
                );
                state.pending_profiles
            }
            _ => Vec::new(),
        };

        let mut profiles: BTreeMap<String, ProfileDefinition> = self
            .diff
            .affected_profiles(submission)?
            .into_iter()
            .map(|profile| (profile.name.clone(), profile))
            .collect();
        if profiles.is_empty() && resumed.is_empty() {
            let stored = self.diff.is_changed(submission)?;
            if stored {
                target.persist(submission)?;
            }
            return Ok(Affected {
                stored,
                profiles: Vec::new(),
            });
        }

        target.persist(submission)?;
        for name in resumed {
            if profiles.contains_key(&name) {
                continue;
            }
            match target.profiles.get(&name)? {
                Some(profile) => {
                    profiles.insert(name, profile);
                }
                None => warn!(profile = %name, "pending profile no longer defined, skipped"),
            }
        }
        Ok(Affected {
            stored: true,
            profiles: profiles.into_values().collect(),
        })
    }
}
