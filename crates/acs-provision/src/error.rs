//! Error types for ACS provisioning
//!
//! Provides error handling for:
//! - Downstream service calls ([`ServiceError`], classified by HTTP status)
//! - Provisioning runs ([`ProvisionError`], wrapping every crate error)
//! - Configuration loading ([`ConfigError`])

use crate::metrics::Phase;
use acs_compiler::CompileError;
use acs_diff::DiffError;
use acs_model::{ErrorKind, ValidationError};
use acs_store::StoreError;
use std::path::PathBuf;

/// Downstream service failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// 429, 5xx, connection or timeout failure
    #[error("{service} {operation} failed transiently{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Transient {
        service: &'static str,
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// 404
    #[error("{service} {operation}: not found")]
    NotFound {
        service: &'static str,
        operation: String,
    },

    /// 409
    #[error("{service} {operation}: conflict: {message}")]
    Conflict {
        service: &'static str,
        operation: String,
        message: String,
    },

    /// Any other 4xx
    #[error("{service} {operation} rejected ({status}): {message}")]
    Rejected {
        service: &'static str,
        operation: String,
        status: u16,
        message: String,
    },

    /// Malformed response or request encoding failure
    #[error("{service} {operation}: {message}")]
    Internal {
        service: &'static str,
        operation: String,
        message: String,
    },
}

impl ServiceError {
    /// Classify a non-success HTTP status
    #[must_use]
    pub fn from_status(
        service: &'static str,
        operation: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        let operation = operation.into();
        let message = message.into();
        match status {
            404 => Self::NotFound { service, operation },
            409 => Self::Conflict {
                service,
                operation,
                message,
            },
            429 | 500..=599 => Self::Transient {
                service,
                operation,
                status: Some(status),
                message,
            },
            _ => Self::Rejected {
                service,
                operation,
                status,
                message,
            },
        }
    }

    /// Connection-level failure
    #[must_use]
    pub fn transport(
        service: &'static str,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transient {
            service,
            operation: operation.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Error classification
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient { .. } => ErrorKind::TransientService,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Rejected { .. } => ErrorKind::Validation,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// True for 404
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML could not be parsed
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main provisioning error type
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Submission is invalid
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    /// Change detection failed
    #[error("diff failed: {0}")]
    Diff(#[from] DiffError),

    /// KPI compilation failed
    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// Store access failed
    #[error("store failed: {0}")]
    Store(#[from] StoreError),

    /// Downstream call failed
    #[error("service call failed: {0}")]
    Service(#[from] ServiceError),

    /// Configuration is unusable
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A provisioning phase failed; remaining phases were skipped
    #[error("{phase} phase failed: {source}")]
    Phase {
        /// Failed phase
        phase: Phase,
        /// Underlying error
        #[source]
        source: Box<ProvisionError>,
    },
}

impl ProvisionError {
    /// Wrap an error with the phase it occurred in
    #[must_use]
    pub fn in_phase(phase: Phase, error: impl Into<ProvisionError>) -> Self {
        Self::Phase {
            phase,
            source: Box::new(error.into()),
        }
    }

    /// Error classification
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(err) => err.kind(),
            Self::Diff(err) => err.kind(),
            Self::Compile(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Service(err) => err.kind(),
            Self::Config(_) => ErrorKind::Validation,
            Self::Phase { source, .. } => source.kind(),
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Phase the error occurred in, if any
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let classify = |status| ServiceError::from_status("kpi", "submit", status, "").kind();
        assert_eq!(classify(404), ErrorKind::NotFound);
        assert_eq!(classify(409), ErrorKind::Conflict);
        assert_eq!(classify(429), ErrorKind::TransientService);
        assert_eq!(classify(503), ErrorKind::TransientService);
        assert_eq!(classify(500), ErrorKind::TransientService);
        assert_eq!(classify(400), ErrorKind::Validation);
        assert_eq!(classify(422), ErrorKind::Validation);
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(ServiceError::transport("index", "create", "connection refused").is_retryable());
    }

    #[test]
    fn phase_error_keeps_inner_kind() {
        let err = ProvisionError::in_phase(
            Phase::Kpi,
            ServiceError::from_status("kpi", "submit", 503, "unavailable"),
        );
        assert_eq!(err.kind(), ErrorKind::TransientService);
        assert_eq!(err.phase(), Some(Phase::Kpi));
        assert!(err.to_string().starts_with("kpi phase failed"));
    }
}
