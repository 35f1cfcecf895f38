//! Provisioning orchestrator
//!
//! Runs the three phases strictly in order over the affected profiles:
//!
//! ```text
//! augmentation ──▶ kpi ──▶ index
//! ```
//!
//! - Each phase records elapsed time since the shared run start, whatever its outcome
//! - A failed phase increments its error counter and aborts the remaining phases
//! - The run state moves `INITIAL → STARTED` up front and `STARTED → COMPLETED`
//!   only when all three phases succeed

use crate::clients::{
    AugmentationService, HttpAugmentationService, HttpIndexService, HttpKpiService, IndexService,
    KpiService,
};
use crate::config::ProvisioningConfig;
use crate::error::{ProvisionError, ServiceError};
use crate::metrics::{FacadeMetrics, Phase, PhaseMetrics};
use crate::phases::{AugmentationPhase, IndexPhase, KpiPhase, PhaseSummary};
use crate::retry::RetryPolicy;
use acs_compiler::KpiCompiler;
use acs_model::{AggregationPeriod, EnvResolver, PlaceholderResolver, ProfileDefinition};
use acs_store::{
    Dictionary, FileRuntimeStore, FileStateStore, InMemoryRuntimeStore, InMemoryStateStore,
    ProvisioningStateStore, RuntimeStore, StoreError,
};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Persistence used by a provisioning run
#[derive(Clone)]
pub struct Stores {
    /// Declared definitions
    pub dictionary: Dictionary,
    /// Deployed artifacts
    pub runtime: Arc<dyn RuntimeStore>,
    /// Run history
    pub state: Arc<dyn ProvisioningStateStore>,
}

impl Stores {
    /// Volatile stores
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            dictionary: Dictionary::in_memory(),
            runtime: Arc::new(InMemoryRuntimeStore::new()),
            state: Arc::new(InMemoryStateStore::new()),
        }
    }

    /// File-backed stores under `dir`
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            dictionary: Dictionary::open(&dir.join("dictionary"))?,
            runtime: Arc::new(FileRuntimeStore::open(dir.join("runtime.json"))?),
            state: Arc::new(FileStateStore::open(dir.join("state.json"))?),
        })
    }

    /// File-backed when a state directory is configured, in-memory otherwise
    pub fn from_config(config: &ProvisioningConfig) -> Result<Self, StoreError> {
        match &config.state_dir {
            Some(dir) => Self::open(dir),
            None => Ok(Self::in_memory()),
        }
    }
}

/// Downstream services used by a provisioning run
#[derive(Clone)]
pub struct Services {
    /// Augmentation registration
    pub augmentation: Arc<dyn AugmentationService>,
    /// KPI calculation
    pub kpi: Arc<dyn KpiService>,
    /// Search index
    pub index: Arc<dyn IndexService>,
}

impl Services {
    /// HTTP clients for the configured endpoints
    pub fn http(config: &ProvisioningConfig) -> Result<Self, ServiceError> {
        let timeout = config.request_timeout();
        Ok(Self {
            augmentation: Arc::new(HttpAugmentationService::new(
                &config.services.augmentation_url,
                timeout,
            )?),
            kpi: Arc::new(HttpKpiService::new(&config.services.kpi_url, timeout)?),
            index: Arc::new(HttpIndexService::new(&config.services.index_url, timeout)?),
        })
    }
}

/// Outcome of a successful provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningReport {
    /// Run id, as recorded in the state store
    pub run_id: Uuid,
    /// Provisioned profiles, sorted
    pub profiles: Vec<String>,
    /// Augmentation phase writes
    pub augmentations: PhaseSummary,
    /// KPI phase writes
    pub kpis: PhaseSummary,
    /// Index phase writes
    pub indexes: PhaseSummary,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// Ordered, retryable provisioning of affected profiles
pub struct ProvisioningOrchestrator {
    stores: Stores,
    services: Services,
    resolver: Arc<dyn PlaceholderResolver>,
    metrics: Arc<dyn PhaseMetrics>,
    default_period: AggregationPeriod,
    policy: RetryPolicy,
    kpi_policy: RetryPolicy,
    dry_run: bool,
}

impl std::fmt::Debug for ProvisioningOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningOrchestrator")
            .field("default_period", &self.default_period)
            .field("policy", &self.policy)
            .field("kpi_policy", &self.kpi_policy)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl ProvisioningOrchestrator {
    /// Create orchestrator with environment placeholders and facade metrics
    #[must_use]
    pub fn new(stores: Stores, services: Services, config: &ProvisioningConfig) -> Self {
        Self {
            stores,
            services,
            resolver: Arc::new(EnvResolver),
            metrics: Arc::new(FacadeMetrics),
            default_period: config.default_aggregation_period,
            policy: config.policy(),
            kpi_policy: config.kpi_policy(),
            dry_run: config.dry_run,
        }
    }

    /// With placeholder resolver
    #[inline]
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn PlaceholderResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// With metrics sink
    #[inline]
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn PhaseMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// With retry policies
    #[inline]
    #[must_use]
    pub fn with_policies(mut self, policy: RetryPolicy, kpi_policy: RetryPolicy) -> Self {
        self.policy = policy;
        self.kpi_policy = kpi_policy;
        self
    }

    /// Backing stores
    #[inline]
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Placeholder resolver
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> Arc<dyn PlaceholderResolver> {
        Arc::clone(&self.resolver)
    }

    /// True when runs must stop after compilation
    #[inline]
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Compiler over `dictionary` and the deployed artifacts
    #[must_use]
    pub fn compiler(&self, dictionary: Dictionary) -> KpiCompiler {
        KpiCompiler::new(dictionary, Arc::clone(&self.stores.runtime))
            .with_default_period(self.default_period)
    }

    /// Provision the given profiles through all three phases
    ///
    /// # Errors
    /// `ProvisionError::Phase` naming the failed phase; the run stays STARTED
    pub async fn provision(
        &self,
        profiles: &[ProfileDefinition],
    ) -> Result<ProvisioningReport, ProvisionError> {
        let mut names: Vec<String> = profiles.iter().map(|p| p.name.clone()).collect();
        names.sort();
        let state = self.stores.state.start(names.clone())?;
        let started = Instant::now();
        info!(run = %state.id, profiles = names.len(), "provisioning started");

        let outcome = self.run_phases(profiles, started).await;
        let elapsed = started.elapsed();
        self.metrics.total_duration(elapsed);

        let (augmentations, kpis, indexes) = match outcome {
            Ok(summaries) => summaries,
            Err(err) => {
                error!(
                    run = %state.id,
                    phase = err.phase().map(Phase::as_str),
                    kind = %err.kind(),
                    error = %err,
                    "provisioning failed"
                );
                return Err(err);
            }
        };
        self.stores.state.complete(state.id)?;
        info!(
            run = %state.id,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "provisioning completed"
        );

        Ok(ProvisioningReport {
            run_id: state.id,
            profiles: names,
            augmentations,
            kpis,
            indexes,
            elapsed,
        })
    }

    async fn run_phases(
        &self,
        profiles: &[ProfileDefinition],
        started: Instant,
    ) -> Result<(PhaseSummary, PhaseSummary, PhaseSummary), ProvisionError> {
        let runtime = self.stores.runtime.as_ref();

        let augmentations = self
            .timed(
                Phase::Augmentation,
                started,
                AugmentationPhase {
                    dictionary: &self.stores.dictionary,
                    runtime,
                    resolver: self.resolver.as_ref(),
                    service: self.services.augmentation.as_ref(),
                    policy: &self.policy,
                }
                .run(profiles),
            )
            .await?;

        let compiler = self.compiler(self.stores.dictionary.clone());
        let (kpis, compilation) = self
            .timed(
                Phase::Kpi,
                started,
                KpiPhase {
                    compiler: &compiler,
                    runtime,
                    service: self.services.kpi.as_ref(),
                    policy: &self.kpi_policy,
                }
                .run(profiles),
            )
            .await?;

        let indexes = self
            .timed(
                Phase::Index,
                started,
                IndexPhase {
                    runtime,
                    service: self.services.index.as_ref(),
                    policy: &self.policy,
                }
                .run(&compilation),
            )
            .await?;

        Ok((augmentations, kpis, indexes))
    }

    async fn timed<T>(
        &self,
        phase: Phase,
        started: Instant,
        work: impl Future<Output = Result<T, ProvisionError>>,
    ) -> Result<T, ProvisionError> {
        let result = work.instrument(info_span!("phase", phase = phase.as_str())).await;
        self.metrics.phase_duration(phase, started.elapsed());
        result.map_err(|err| {
            self.metrics.phase_error(phase);
            ProvisionError::in_phase(phase, err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockAugmentationService, MockIndexService, MockKpiService};
    use crate::metrics::MockPhaseMetrics;
    use acs_model::{
        ErrorKind, InputMetric, KpiDefinition, KpiReference, PmDefinition, ProvisioningStatus,
    };
    use acs_store::DictionaryStore;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn stores() -> Stores {
        let stores = Stores::in_memory();
        stores
            .dictionary
            .pm_defs
            .save(&PmDefinition::new("pmCounters.att", "5G|PM_COUNTERS|smf_1"))
            .unwrap();
        stores
            .dictionary
            .kpi_defs
            .save(
                &KpiDefinition::new("att", "SUM(a)", "SUM")
                    .with_input(InputMetric::pm("pmCounters.att", "a")),
            )
            .unwrap();
        stores
    }

    fn profiles() -> Vec<ProfileDefinition> {
        vec![ProfileDefinition::new("p1", vec!["snssai".into()]).with_kpi(KpiReference::new("att"))]
    }

    fn orchestrator(
        stores: Stores,
        kpi: MockKpiService,
        index: MockIndexService,
        metrics: MockPhaseMetrics,
    ) -> ProvisioningOrchestrator {
        let services = Services {
            augmentation: Arc::new(MockAugmentationService::new()),
            kpi: Arc::new(kpi),
            index: Arc::new(index),
        };
        ProvisioningOrchestrator::new(stores, services, &ProvisioningConfig::default())
            .with_metrics(Arc::new(metrics))
            .with_policies(RetryPolicy::immediate(3), RetryPolicy::immediate(3))
    }

    #[tokio::test]
    async fn phases_run_in_order_and_complete_the_run() {
        let mut kpi = MockKpiService::new();
        kpi.expect_exists().returning(|| Ok(()));
        kpi.expect_submit().times(1).returning(|_| Ok(()));
        let mut index = MockIndexService::new();
        index.expect_create().times(1).returning(|_| Ok(()));

        let mut seq = Sequence::new();
        let mut metrics = MockPhaseMetrics::new();
        for phase in Phase::ALL {
            metrics
                .expect_phase_duration()
                .with(eq(phase), mockall::predicate::always())
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }
        metrics.expect_total_duration().times(1).return_const(());
        metrics.expect_phase_error().never();

        let stores = stores();
        let report = orchestrator(stores.clone(), kpi, index, metrics)
            .provision(&profiles())
            .await
            .unwrap();

        assert_eq!(report.profiles, vec!["p1"]);
        assert_eq!(report.kpis.created, 1);
        assert_eq!(report.indexes.created, 1);
        let latest = stores.state.latest().unwrap().unwrap();
        assert_eq!(latest.id, report.run_id);
        assert_eq!(latest.status, ProvisioningStatus::Completed);
    }

    #[tokio::test]
    async fn kpi_failure_aborts_index_phase_and_leaves_run_started() {
        let mut kpi = MockKpiService::new();
        kpi.expect_exists()
            .returning(|| Err(ServiceError::from_status("kpi", "probe", 503, "")));
        kpi.expect_submit().returning(|_| Ok(()));
        let mut index = MockIndexService::new();
        index.expect_create().never();

        let mut metrics = MockPhaseMetrics::new();
        metrics
            .expect_phase_duration()
            .withf(|phase, _| *phase != Phase::Index)
            .times(2)
            .return_const(());
        metrics
            .expect_phase_error()
            .with(eq(Phase::Kpi))
            .times(1)
            .return_const(());
        metrics.expect_total_duration().times(1).return_const(());

        let stores = stores();
        let err = orchestrator(stores.clone(), kpi, index, metrics)
            .provision(&profiles())
            .await
            .unwrap_err();

        assert_eq!(err.phase(), Some(Phase::Kpi));
        assert_eq!(err.kind(), ErrorKind::TransientService);
        let latest = stores.state.latest().unwrap().unwrap();
        assert_eq!(latest.status, ProvisioningStatus::Started);
        assert_eq!(latest.pending_profiles, vec!["p1"]);
        assert!(stores.runtime.all_kpis().unwrap().is_empty());
    }
}
