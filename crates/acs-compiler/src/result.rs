//! Compilation results

use acs_model::{DeployedKpi, KpiKind};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// What provisioning must do with a compiled artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Not deployed yet
    Create,
    /// Deployed under the same name with different content
    Update,
    /// Deployed and identical
    Unchanged,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Unchanged => "unchanged",
        })
    }
}

/// One deduplicated artifact and the profiles that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledKpi {
    /// The artifact
    pub artifact: DeployedKpi,
    /// Required downstream action
    pub action: Action,
    /// Profiles resolving to this artifact
    pub profiles: BTreeSet<String>,
}

/// Output of one compilation run, simple artifacts first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationResult {
    /// Compiled artifacts in resolution order
    pub kpis: Vec<CompiledKpi>,
}

impl CompilationResult {
    /// Number of artifacts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.kpis.len()
    }

    /// True if nothing was compiled
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kpis.is_empty()
    }

    /// All artifacts
    pub fn artifacts(&self) -> impl Iterator<Item = &DeployedKpi> {
        self.kpis.iter().map(|compiled| &compiled.artifact)
    }

    /// Artifacts that must be written downstream
    #[must_use]
    pub fn to_write(&self) -> Vec<DeployedKpi> {
        self.kpis
            .iter()
            .filter(|compiled| compiled.action != Action::Unchanged)
            .map(|compiled| compiled.artifact.clone())
            .collect()
    }

    /// Number of artifacts with the given action
    #[must_use]
    pub fn count(&self, action: Action) -> usize {
        self.kpis
            .iter()
            .filter(|compiled| compiled.action == action)
            .count()
    }

    /// Artifacts compiled from a source KPI
    pub fn for_source<'a>(&'a self, source_kpi: &'a str) -> impl Iterator<Item = &'a CompiledKpi> {
        self.kpis
            .iter()
            .filter(move |compiled| compiled.artifact.source_kpi == source_kpi)
    }

    /// Number of artifacts of a kind
    #[must_use]
    pub fn count_kind(&self, kind: KpiKind) -> usize {
        self.artifacts().filter(|artifact| artifact.kind == kind).count()
    }
}
