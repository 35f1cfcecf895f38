//! Metrics sink that keeps every recording for assertions

use acs_provision::{Phase, PhaseMetrics};
use parking_lot::Mutex;
use std::time::Duration;

/// One recorded metric update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// Phase duration gauge
    PhaseDuration(Phase, Duration),
    /// Total duration gauge
    TotalDuration(Duration),
    /// Phase error counter increment
    PhaseError(Phase),
}

/// In-memory [`PhaseMetrics`]
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    recorded: Mutex<Vec<Recorded>>,
}

impl RecordingMetrics {
    /// Every recording, in order
    #[must_use]
    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().clone()
    }

    /// Phases whose duration gauge was set, in order
    #[must_use]
    pub fn timed_phases(&self) -> Vec<Phase> {
        self.recorded
            .lock()
            .iter()
            .filter_map(|recorded| match recorded {
                Recorded::PhaseDuration(phase, _) => Some(*phase),
                _ => None,
            })
            .collect()
    }

    /// Error counter value for a phase
    #[must_use]
    pub fn errors(&self, phase: Phase) -> usize {
        self.recorded
            .lock()
            .iter()
            .filter(|recorded| **recorded == Recorded::PhaseError(phase))
            .count()
    }

    /// Last total duration recorded
    #[must_use]
    pub fn total_duration(&self) -> Option<Duration> {
        self.recorded
            .lock()
            .iter()
            .rev()
            .find_map(|recorded| match recorded {
                Recorded::TotalDuration(elapsed) => Some(*elapsed),
                _ => None,
            })
    }
}

impl PhaseMetrics for RecordingMetrics {
    fn phase_duration(&self, phase: Phase, elapsed: Duration) {
        self.recorded
            .lock()
            .push(Recorded::PhaseDuration(phase, elapsed));
    }

    fn total_duration(&self, elapsed: Duration) {
        self.recorded.lock().push(Recorded::TotalDuration(elapsed));
    }

    fn phase_error(&self, phase: Phase) {
        self.recorded.lock().push(Recorded::PhaseError(phase));
    }
}
