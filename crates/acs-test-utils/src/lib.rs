//! Testing utilities for the ACS workspace
//!
//! Shared fixtures, fake downstream services and a recording metrics sink.

pub mod fakes;
pub mod fixtures;
pub mod metrics;

pub use fakes::{FakeAugmentationService, FakeIndexService, FakeKpiService};
pub use fixtures::{sample_submission, SAMPLE_SUBMISSION_YAML};
pub use metrics::{Recorded, RecordingMetrics};

use acs_provision::{
    ProvisioningConfig, ProvisioningOrchestrator, ProvisioningService, RetryPolicy, Services,
    Stores,
};
use std::sync::Arc;

/// Stores, fakes and metrics wired together
pub struct TestHarness {
    /// Backing stores
    pub stores: Stores,
    /// Fake augmentation registry
    pub augmentation: Arc<FakeAugmentationService>,
    /// Fake KPI calculator
    pub kpi: Arc<FakeKpiService>,
    /// Fake search index
    pub index: Arc<FakeIndexService>,
    /// Recorded metrics
    pub metrics: Arc<RecordingMetrics>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::with_stores(Stores::in_memory())
    }
}

impl TestHarness {
    /// Harness over in-memory stores
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Harness over the given stores
    #[must_use]
    pub fn with_stores(stores: Stores) -> Self {
        Self {
            stores,
            augmentation: Arc::new(FakeAugmentationService::default()),
            kpi: Arc::new(FakeKpiService::default()),
            index: Arc::new(FakeIndexService::default()),
            metrics: Arc::new(RecordingMetrics::default()),
        }
    }

    /// Orchestrator without retry delays, resolving `cardq.host`
    #[must_use]
    pub fn orchestrator(&self, config: &ProvisioningConfig) -> ProvisioningOrchestrator {
        let services = Services {
            augmentation: self.augmentation.clone(),
            kpi: self.kpi.clone(),
            index: self.index.clone(),
        };
        ProvisioningOrchestrator::new(self.stores.clone(), services, config)
            .with_resolver(Arc::new(fixtures::resolver()))
            .with_metrics(self.metrics.clone())
            .with_policies(
                RetryPolicy::immediate(config.retry.max_attempts),
                RetryPolicy::immediate(config.retry.kpi_max_attempts),
            )
    }

    /// Service with the default configuration
    #[must_use]
    pub fn service(&self) -> ProvisioningService {
        ProvisioningService::new(self.orchestrator(&ProvisioningConfig::default()))
    }
}
