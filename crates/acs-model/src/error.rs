//! Error types for the definition model
//!
//! Provides:
//! - [`ErrorKind`], the classification shared by every ACS crate
//! - [`ValidationError`] for malformed or out-of-range definitions

use crate::period::AggregationPeriod;
use std::fmt::{self, Display, Formatter};

/// Error classification shared across the provisioning core
///
/// Every crate error exposes a `kind()` so callers can decide on retries
/// and reporting without matching on concrete variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input, unresolved reference
    Validation,
    /// Conflicting state (duplicate, diverging definitions)
    Conflict,
    /// Referenced entity does not exist
    NotFound,
    /// Transient downstream failure (429, 5xx, connection)
    TransientService,
    /// Persistence or serialization failure
    Internal,
}

impl ErrorKind {
    /// Check if errors of this kind may be retried
    #[inline]
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientService)
    }

    /// Stable lowercase label (used in logs and metrics)
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::TransientService => "transient_service",
            Self::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for submitted definitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Name does not match the permitted pattern
    #[error("invalid {kind} name '{name}': must match ^[A-Za-z0-9][A-Za-z0-9_]*$")]
    InvalidName { kind: &'static str, name: String },

    /// Context or aggregation field list is empty
    #[error("{owner} must declare a non-empty context")]
    EmptyContext { owner: String },

    /// Aggregation period outside the permitted domain
    #[error(
        "aggregation period {value} is not permitted; allowed values are {:?}",
        AggregationPeriod::PERMITTED
    )]
    InvalidAggregationPeriod { value: u32 },

    /// Augmentation rule is missing a required form
    #[error("augmentation '{augmentation}': {reason}")]
    InvalidAugmentationRule { augmentation: String, reason: String },

    /// Two input metrics of one KPI share an alias
    #[error("kpi '{kpi}' declares alias '{alias}' more than once")]
    DuplicateAlias { kpi: String, alias: String },

    /// A profile references the same KPI twice
    #[error("profile '{profile}' references kpi '{kpi}' more than once")]
    DuplicateReference { profile: String, kpi: String },

    /// Definition is structurally incomplete
    #[error("invalid definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// Merge called without a submission
    #[error("cannot merge a missing submission")]
    MissingSubmission,
}

impl ValidationError {
    /// Create invalid definition error
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Error classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
