//! Provisioning metrics
//!
//! Phase timings are gauges of elapsed seconds since the shared run start,
//! so the index gauge of a successful run equals the whole pipeline time.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// Gauge: seconds from run start to the end of a phase, labelled by `phase`
pub const PHASE_DURATION_GAUGE: &str = "acs_provisioning_phase_duration_seconds";

/// Gauge: seconds from run start to run end
pub const TOTAL_DURATION_GAUGE: &str = "acs_provisioning_total_duration_seconds";

/// Counter: failed phases, labelled by `phase`
pub const PHASE_ERROR_COUNTER: &str = "acs_provisioning_phase_errors_total";

/// Provisioning phase, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Augmentation registration
    Augmentation,
    /// KPI compilation and submission
    Kpi,
    /// Search-index definitions
    Index,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 3] = [Phase::Augmentation, Phase::Kpi, Phase::Index];

    /// Metric label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Augmentation => "augmentation",
            Self::Kpi => "kpi",
            Self::Index => "index",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for provisioning timings and failures
#[cfg_attr(test, mockall::automock)]
pub trait PhaseMetrics: Send + Sync {
    /// Elapsed time from run start when `phase` finished, whatever its outcome
    fn phase_duration(&self, phase: Phase, elapsed: Duration);

    /// Elapsed time of the whole run
    fn total_duration(&self, elapsed: Duration);

    /// A phase failed unrecoverably
    fn phase_error(&self, phase: Phase);
}

/// Records through the `metrics` facade to whatever exporter is installed
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeMetrics;

impl PhaseMetrics for FacadeMetrics {
    fn phase_duration(&self, phase: Phase, elapsed: Duration) {
        metrics::gauge!(PHASE_DURATION_GAUGE, "phase" => phase.as_str()).set(elapsed.as_secs_f64());
    }

    fn total_duration(&self, elapsed: Duration) {
        metrics::gauge!(TOTAL_DURATION_GAUGE).set(elapsed.as_secs_f64());
    }

    fn phase_error(&self, phase: Phase) {
        metrics::counter!(PHASE_ERROR_COUNTER, "phase" => phase.as_str()).increment(1);
    }
}
