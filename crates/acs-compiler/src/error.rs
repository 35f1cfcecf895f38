//! Compilation errors

use acs_model::{AggregationPeriod, ErrorKind, ValidationError};
use acs_store::StoreError;

/// Errors raised while compiling KPIs
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A definition or period is invalid
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A profile references a KPI missing from the dictionary
    #[error("profile '{profile}' references unknown kpi '{kpi}'")]
    UnknownKpi { profile: String, kpi: String },

    /// A simple KPI references a PM counter missing from the dictionary
    #[error("kpi '{kpi}' references unknown pm definition '{pm}'")]
    UnknownPm { kpi: String, pm: String },

    /// A simple KPI reads counters from more than one schema
    #[error("kpi '{kpi}' reads from several schemas: {schemas:?}")]
    MixedSchemas { kpi: String, schemas: Vec<String> },

    /// A complex KPI also declares PM inputs
    #[error("kpi '{kpi}' mixes PM_DATA and KPI inputs")]
    MixedInputs { kpi: String },

    /// A complex KPI input is neither in the profile, compiled earlier, nor deployed
    #[error("kpi '{kpi}' in profile '{profile}': input '{input}' is not resolved on context {context:?}")]
    Unresolved {
        profile: String,
        kpi: String,
        input: String,
        context: Vec<String>,
    },

    /// KPI inputs form a cycle
    #[error("kpi '{kpi}' depends on itself")]
    Cycle { kpi: String },

    /// Same identity resolved with two periods in one run
    #[error("kpi '{kpi}' resolved with conflicting periods {first} and {second}")]
    PeriodConflict {
        kpi: String,
        first: AggregationPeriod,
        second: AggregationPeriod,
    },

    /// A store lookup failed
    #[error("store lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl CompileError {
    /// Error classification
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PeriodConflict { .. } => ErrorKind::Conflict,
            Self::Store(err) => err.kind(),
            Self::Validation(_)
            | Self::UnknownKpi { .. }
            | Self::UnknownPm { .. }
            | Self::MixedSchemas { .. }
            | Self::MixedInputs { .. }
            | Self::Unresolved { .. }
            | Self::Cycle { .. } => ErrorKind::Validation,
        }
    }
}
