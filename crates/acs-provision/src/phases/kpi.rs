//! KPI phase: compile, submit what changed, record what was deployed

use super::PhaseSummary;
use crate::clients::KpiService;
use crate::error::ProvisionError;
use crate::retry::RetryPolicy;
use acs_compiler::{Action, CompilationResult, KpiCompiler};
use acs_model::{KpiKind, ProfileDefinition};
use acs_store::RuntimeStore;
use tracing::{debug, info};

pub(crate) struct KpiPhase<'a> {
    pub(crate) compiler: &'a KpiCompiler,
    pub(crate) runtime: &'a dyn RuntimeStore,
    pub(crate) service: &'a dyn KpiService,
    pub(crate) policy: &'a RetryPolicy,
}

pub(crate) fn summarize(compilation: &CompilationResult) -> PhaseSummary {
    PhaseSummary {
        created: compilation.count(Action::Create),
        updated: compilation.count(Action::Update),
        unchanged: compilation.count(Action::Unchanged),
        deleted: 0,
    }
}

impl KpiPhase<'_> {
    pub(crate) async fn run(
        &self,
        profiles: &[ProfileDefinition],
    ) -> Result<(PhaseSummary, CompilationResult), ProvisionError> {
        let compilation = self.compiler.calculate_affected_kpis(profiles)?;
        let summary = summarize(&compilation);
        let to_write = compilation.to_write();

        if to_write.is_empty() {
            debug!(kpis = compilation.len(), "all kpis unchanged");
            return Ok((summary, compilation));
        }

        self.policy
            .run_with_probe(
                "kpi.submit",
                || self.service.exists(),
                |_| self.service.submit(&to_write),
            )
            .await?;
        self.runtime.save_kpis(&to_write)?;

        info!(
            submitted = to_write.len(),
            simple = compilation.count_kind(KpiKind::Simple),
            complex = compilation.count_kind(KpiKind::Complex),
            unchanged = summary.unchanged,
            "kpis provisioned"
        );
        Ok((summary, compilation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockKpiService;
    use crate::error::ServiceError;
    use acs_model::{ErrorKind, InputMetric, KpiDefinition, KpiReference, PmDefinition};
    use acs_store::{Dictionary, DictionaryStore, InMemoryRuntimeStore};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn compiler(runtime: Arc<InMemoryRuntimeStore>) -> KpiCompiler {
        let dictionary = Dictionary::in_memory();
        dictionary
            .pm_defs
            .save(&PmDefinition::new("pmCounters.att", "5G|PM_COUNTERS|smf_1"))
            .unwrap();
        dictionary
            .kpi_defs
            .save(
                &KpiDefinition::new("att", "SUM(a)", "SUM")
                    .with_input(InputMetric::pm("pmCounters.att", "a")),
            )
            .unwrap();
        KpiCompiler::new(dictionary, runtime)
    }

    fn profiles() -> Vec<ProfileDefinition> {
        vec![ProfileDefinition::new("p1", vec!["snssai".into()]).with_kpi(KpiReference::new("att"))]
    }

    fn unavailable() -> ServiceError {
        ServiceError::from_status("kpi", "probe", 503, "")
    }

    #[tokio::test]
    async fn submits_after_probe_recovers_and_records_artifacts() {
        let runtime = Arc::new(InMemoryRuntimeStore::new());
        let compiler = compiler(runtime.clone());
        let probes = Arc::new(AtomicU32::new(0));
        let mut service = MockKpiService::new();
        let counter = probes.clone();
        service.expect_exists().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(())
            }
        });
        service
            .expect_submit()
            .withf(|kpis| kpis.len() == 1 && kpis[0].source_kpi == "att")
            .returning(|_| Ok(()));

        let policy = RetryPolicy::immediate(RetryPolicy::KPI_SUBMISSION_ATTEMPTS);
        let phase = KpiPhase {
            compiler: &compiler,
            runtime: runtime.as_ref(),
            service: &service,
            policy: &policy,
        };
        let (summary, compilation) = phase.run(&profiles()).await.unwrap();

        assert_eq!(probes.load(Ordering::SeqCst), 3);
        assert_eq!(summary.created, 1);
        assert_eq!(runtime.all_kpis().unwrap(), compilation.to_write());
    }

    #[tokio::test]
    async fn unchanged_kpis_are_not_submitted() {
        let runtime = Arc::new(InMemoryRuntimeStore::new());
        let compiler = compiler(runtime.clone());
        runtime
            .save_kpis(
                &compiler
                    .calculate_affected_kpis(&profiles())
                    .unwrap()
                    .to_write(),
            )
            .unwrap();

        let mut service = MockKpiService::new();
        service.expect_exists().never();
        service.expect_submit().never();

        let policy = RetryPolicy::immediate(3);
        let (summary, _) = KpiPhase {
            compiler: &compiler,
            runtime: runtime.as_ref(),
            service: &service,
            policy: &policy,
        }
        .run(&profiles())
        .await
        .unwrap();
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.writes(), 0);
    }

    #[tokio::test]
    async fn rejected_submission_is_not_retried_and_not_recorded() {
        let runtime = Arc::new(InMemoryRuntimeStore::new());
        let compiler = compiler(runtime.clone());
        let mut service = MockKpiService::new();
        service.expect_exists().returning(|| Ok(()));
        service
            .expect_submit()
            .times(1)
            .returning(|_| Err(ServiceError::from_status("kpi", "submit", 400, "bad sql")));

        let policy = RetryPolicy::immediate(10);
        let err = KpiPhase {
            compiler: &compiler,
            runtime: runtime.as_ref(),
            service: &service,
            policy: &policy,
        }
        .run(&profiles())
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(runtime.all_kpis().unwrap().is_empty());
    }
}
