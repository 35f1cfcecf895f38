//! ACS Provisioning
//!
//! Turns a definition submission into downstream configuration:
//! - Detects which profiles a submission affects
//! - Registers augmentations, submits compiled KPIs, refreshes search indexes
//! - Retries transient downstream failures with bounded backoff
//! - Records per-phase timings and failures through the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use acs_provision::prelude::*;
//!
//! # async fn example(submission: ResourceSubmission) -> Result<(), ProvisionError> {
//! let config = ProvisioningConfig::load(Path::new("acs.toml"))?;
//! let orchestrator = ProvisioningOrchestrator::new(
//!     Stores::from_config(&config)?,
//!     Services::http(&config)?,
//!     &config,
//! );
//! let service = ProvisioningService::new(orchestrator);
//!
//! if let SubmissionOutcome::Provisioned(report) = service.submit(&submission).await? {
//!     println!("provisioned {} profiles", report.profiles.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod clients;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
mod phases;
pub mod retry;
pub mod service;

pub use clients::{
    AugmentationService, HttpAugmentationService, HttpIndexService, HttpKpiService, IndexService,
    KpiService,
};
pub use config::{ProvisioningConfig, RetrySettings, ServiceEndpoints};
pub use error::{ConfigError, ProvisionError, ServiceError};
pub use metrics::{FacadeMetrics, Phase, PhaseMetrics};
pub use orchestrator::{ProvisioningOrchestrator, ProvisioningReport, Services, Stores};
pub use phases::PhaseSummary;
pub use retry::{Backoff, RetryPolicy};
pub use service::{Plan, ProvisioningService, SubmissionOutcome};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for provisioning
    pub use crate::{
        Phase, ProvisionError, ProvisioningConfig, ProvisioningOrchestrator, ProvisioningReport,
        ProvisioningService, RetryPolicy, Services, Stores, SubmissionOutcome,
    };
    pub use acs_model::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
