//! Store errors

use acs_model::{ErrorKind, StateTransitionError};
use std::path::PathBuf;

/// Errors raised by dictionary, runtime and state stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Snapshot file could not be read or written
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content could not be encoded or decoded
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Referenced record does not exist
    #[error("{entity} '{name}' not found")]
    NotFound { entity: &'static str, name: String },

    /// Illegal state change
    #[error(transparent)]
    Transition(#[from] StateTransitionError),
}

impl StoreError {
    /// Create io error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Error classification
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::Serialization(_) => ErrorKind::Internal,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transition(_) => ErrorKind::Conflict,
        }
    }
}
