//! The three provisioning phases
//!
//! Run strictly in order by the orchestrator:
//! 1. [`AugmentationPhase`]: register, update or drop augmentations
//! 2. [`KpiPhase`]: compile affected KPIs and submit the changed ones
//! 3. [`IndexPhase`]: refresh index definitions of touched output tables

mod augmentation;
mod index;
mod kpi;

pub(crate) use augmentation::AugmentationPhase;
pub(crate) use index::IndexPhase;
pub(crate) use kpi::KpiPhase;

use serde::Serialize;

/// Downstream writes performed by one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    /// Artifacts created
    pub created: usize,
    /// Artifacts replaced
    pub updated: usize,
    /// Artifacts left untouched
    pub unchanged: usize,
    /// Artifacts removed
    pub deleted: usize,
}

impl PhaseSummary {
    /// Number of downstream writes
    #[inline]
    #[must_use]
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}
