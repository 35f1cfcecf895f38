//! Diff errors

use acs_model::ErrorKind;
use acs_store::StoreError;

/// Errors raised while diffing a submission
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A store lookup failed
    #[error("store lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl DiffError {
    /// Error classification
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(err) => err.kind(),
        }
    }
}
