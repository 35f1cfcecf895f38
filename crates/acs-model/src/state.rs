//! Provisioning run state
//!
//! A run moves `Initial → Started → Completed`. A run that fails after
//! starting stays `Started`; its pending profiles are replayed by the next
//! submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// Status of a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningStatus {
    /// Created, not yet running
    Initial,
    /// Phases in progress, or a previous run aborted
    Started,
    /// All phases succeeded
    Completed,
}

impl ProvisioningStatus {
    /// Stable label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
        }
    }
}

impl Display for ProvisioningStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Illegal status change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal provisioning state transition {from} -> {to}")]
pub struct StateTransitionError {
    /// Current status
    pub from: ProvisioningStatus,
    /// Requested status
    pub to: ProvisioningStatus,
}

/// Statuses reachable from `from`
#[must_use]
pub fn allowed_transitions(from: ProvisioningStatus) -> Vec<ProvisioningStatus> {
    use ProvisioningStatus::{Completed, Initial, Started};
    match from {
        Initial => vec![Started],
        Started => vec![Completed],
        Completed => vec![],
    }
}

/// Validate a status change
///
/// # Errors
/// `StateTransitionError` when `to` is not reachable from `from`
pub fn validate_transition(
    from: ProvisioningStatus,
    to: ProvisioningStatus,
) -> Result<(), StateTransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateTransitionError { from, to })
    }
}

/// One provisioning run record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningState {
    /// Run id
    pub id: Uuid,
    /// Current status
    pub status: ProvisioningStatus,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// End of a completed run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Profiles the run provisions
    #[serde(default)]
    pub pending_profiles: Vec<String>,
}

impl ProvisioningState {
    /// Create a fresh `Initial` record
    #[must_use]
    pub fn new(pending_profiles: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: ProvisioningStatus::Initial,
            started_at: Utc::now(),
            finished_at: None,
            pending_profiles,
        }
    }

    /// Move to `Started`
    ///
    /// # Errors
    /// `StateTransitionError` unless currently `Initial`
    pub fn start(&mut self) -> Result<(), StateTransitionError> {
        validate_transition(self.status, ProvisioningStatus::Started)?;
        self.status = ProvisioningStatus::Started;
        self.started_at = Utc::now();
        Ok(())
    }

    /// Move to `Completed`
    ///
    /// # Errors
    /// `StateTransitionError` unless currently `Started`
    pub fn complete(&mut self) -> Result<(), StateTransitionError> {
        validate_transition(self.status, ProvisioningStatus::Completed)?;
        self.status = ProvisioningStatus::Completed;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// True if the run started but never completed
    #[inline]
    #[must_use]
    pub fn is_unfinished(&self) -> bool {
        self.status == ProvisioningStatus::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = ProvisioningStatus> {
        prop_oneof![
            Just(ProvisioningStatus::Initial),
            Just(ProvisioningStatus::Started),
            Just(ProvisioningStatus::Completed),
        ]
    }

    #[test]
    fn run_lifecycle() {
        let mut state = ProvisioningState::new(vec!["p".into()]);
        assert_eq!(state.status, ProvisioningStatus::Initial);
        state.start().unwrap();
        assert!(state.is_unfinished());
        state.complete().unwrap();
        assert_eq!(state.status, ProvisioningStatus::Completed);
        assert!(state.finished_at.is_some());
    }

    #[test]
    fn cannot_complete_without_start() {
        let mut state = ProvisioningState::new(vec![]);
        let err = state.complete().unwrap_err();
        assert_eq!(err.from, ProvisioningStatus::Initial);
        assert_eq!(state.status, ProvisioningStatus::Initial);
    }

    #[test]
    fn completed_is_terminal() {
        assert!(allowed_transitions(ProvisioningStatus::Completed).is_empty());
    }

    #[test]
    fn status_wire_names() {
        let json = serde_json::to_string(&ProvisioningStatus::Started).unwrap();
        assert_eq!(json, "\"STARTED\"");
    }

    proptest! {
        #[test]
        fn validate_agrees_with_allowed(from in any_status(), to in any_status()) {
            let allowed = allowed_transitions(from).contains(&to);
            prop_assert_eq!(validate_transition(from, to).is_ok(), allowed);
        }
    }
}
