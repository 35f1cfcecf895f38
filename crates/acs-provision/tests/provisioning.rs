//! End-to-end submissions against fake downstream services

use acs_model::{
    ErrorKind, InputMetric, KpiDefinition, KpiKind, KpiReference, ProfileDefinition,
    ProvisioningStatus, ResourceSubmission,
};
use acs_provision::{
    Phase, ProvisioningConfig, ProvisioningReport, ProvisioningService, ServiceError, Stores,
    SubmissionOutcome,
};
use acs_test_utils::{fixtures, sample_submission, TestHarness};
use pretty_assertions::assert_eq;

fn provisioned(outcome: SubmissionOutcome) -> ProvisioningReport {
    match outcome {
        SubmissionOutcome::Provisioned(report) => report,
        other => panic!("expected a provisioning run, got {other:?}"),
    }
}

#[tokio::test]
async fn first_submission_provisions_every_phase() {
    let harness = TestHarness::new();
    let report = provisioned(harness.service().submit(&sample_submission()).await.unwrap());

    assert_eq!(report.profiles, vec!["node", "slice"]);
    assert_eq!(report.augmentations.created, 1);
    assert_eq!(report.kpis.created, 4);
    assert_eq!(report.indexes.created, 2);

    let registered = harness.augmentation.registered("cardq").unwrap();
    assert_eq!(registered.url, format!("http://{}/augment", fixtures::CARDQ_HOST));
    assert_eq!(harness.kpi.deployed().len(), 4);
    assert!(harness.index.index("acs-index-kpi-cardq-nodefdn-snssai-15").is_some());
    assert!(harness.index.index("acs-index-kpi-nodefdn-15").is_some());

    let state = harness.stores.state.latest().unwrap().unwrap();
    assert_eq!(state.id, report.run_id);
    assert_eq!(state.status, ProvisioningStatus::Completed);

    assert_eq!(
        harness.metrics.timed_phases(),
        vec![Phase::Augmentation, Phase::Kpi, Phase::Index]
    );
    assert!(harness.metrics.total_duration().is_some());
}

#[tokio::test]
async fn identical_resubmission_is_unchanged() {
    let harness = TestHarness::new();
    let service = harness.service();
    service.submit(&sample_submission()).await.unwrap();

    let outcome = service.submit(&sample_submission()).await.unwrap();

    assert_eq!(outcome, SubmissionOutcome::Unchanged);
    assert_eq!(harness.kpi.calls("submit"), 1);
    assert_eq!(harness.stores.state.history().unwrap().len(), 1);
}

#[tokio::test]
async fn kpi_failure_leaves_run_started_and_skips_indexes() {
    let harness = TestHarness::new();
    harness.kpi.fail(
        "probe",
        10,
        ServiceError::from_status("kpi", "probe", 503, "unavailable"),
    );

    let err = harness
        .service()
        .submit(&sample_submission())
        .await
        .unwrap_err();

    assert_eq!(err.phase(), Some(Phase::Kpi));
    assert_eq!(err.kind(), ErrorKind::TransientService);
    assert_eq!(harness.kpi.calls("probe"), 10);
    assert_eq!(harness.kpi.calls("submit"), 0);
    assert!(harness.index.is_empty());
    assert_eq!(harness.metrics.errors(Phase::Kpi), 1);
    assert_eq!(
        harness.metrics.timed_phases(),
        vec![Phase::Augmentation, Phase::Kpi]
    );

    let state = harness.stores.state.latest().unwrap().unwrap();
    assert_eq!(state.status, ProvisioningStatus::Started);
    assert_eq!(state.pending_profiles, vec!["node", "slice"]);
}

#[tokio::test]
async fn unfinished_run_is_resumed_by_the_next_submission() {
    let harness = TestHarness::new();
    let service = harness.service();
    harness
        .kpi
        .fail("submit", 1, ServiceError::from_status("kpi", "submit", 400, "rejected"));
    assert!(service.submit(&sample_submission()).await.is_err());

    let report = provisioned(service.submit(&sample_submission()).await.unwrap());

    assert_eq!(report.profiles, vec!["node", "slice"]);
    assert_eq!(harness.kpi.deployed().len(), 4);
    assert_eq!(report.augmentations.unchanged, 1);
    let state = harness.stores.state.latest().unwrap().unwrap();
    assert_eq!(state.status, ProvisioningStatus::Completed);
}

#[tokio::test]
async fn changed_kpi_updates_only_its_artifacts() {
    let harness = TestHarness::new();
    let service = harness.service();
    service.submit(&sample_submission()).await.unwrap();

    let change = ResourceSubmission::new().with_kpi_def(
        KpiDefinition::new("att", "SUM(a) * 1", "SUM")
            .with_input(InputMetric::pm("pmCounters.att", "a")),
    );
    let report = provisioned(service.submit(&change).await.unwrap());

    assert_eq!(report.profiles, vec!["node", "slice"]);
    assert_eq!(report.kpis.updated, 2);
    assert_eq!(report.kpis.unchanged, 2);
    assert_eq!(report.augmentations.writes(), 0);
    assert_eq!(report.indexes.writes(), 0);
    assert_eq!(
        harness.stores.dictionary.kpi_defs.get("att").unwrap().unwrap().expression,
        "SUM(a) * 1"
    );
}

#[tokio::test]
async fn dry_run_compiles_without_side_effects() {
    let harness = TestHarness::new();
    let config = ProvisioningConfig::default().with_dry_run(true);
    let service = ProvisioningService::new(harness.orchestrator(&config));

    let outcome = service.submit(&sample_submission()).await.unwrap();

    let SubmissionOutcome::Planned(plan) = outcome else {
        panic!("expected a plan, got {outcome:?}");
    };
    assert_eq!(plan.profiles, vec!["node", "slice"]);
    assert_eq!(plan.compilation.len(), 4);
    assert!(harness.kpi.call_log().is_empty());
    assert!(harness.augmentation.call_log().is_empty());
    assert!(harness.stores.dictionary.kpi_defs.all().unwrap().is_empty());
    assert!(harness.stores.state.latest().unwrap().is_none());
}

#[tokio::test]
async fn file_backed_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = TestHarness::with_stores(Stores::open(dir.path()).unwrap());
    first.service().submit(&sample_submission()).await.unwrap();

    let restarted = TestHarness::with_stores(Stores::open(dir.path()).unwrap());
    let outcome = restarted.service().submit(&sample_submission()).await.unwrap();

    assert_eq!(outcome, SubmissionOutcome::Unchanged);
    assert!(restarted.kpi.call_log().is_empty());
    assert_eq!(restarted.stores.runtime.all_kpis().unwrap().len(), 4);
}

#[tokio::test]
async fn definitions_without_profiles_are_stored_for_later_profiles() {
    let harness = TestHarness::new();
    let service = harness.service();
    let mut definitions = sample_submission();
    let profiles = std::mem::take(&mut definitions.profile_defs);

    assert_eq!(
        service.submit(&definitions).await.unwrap(),
        SubmissionOutcome::Stored
    );
    assert!(harness.stores.dictionary.kpi_defs.get("ratio").unwrap().is_some());
    assert!(harness.stores.dictionary.augmentations.get("cardq").unwrap().is_some());
    assert!(harness.kpi.call_log().is_empty());
    assert_eq!(
        service.submit(&definitions).await.unwrap(),
        SubmissionOutcome::Unchanged
    );

    let profiles_only = ResourceSubmission {
        profile_defs: profiles,
        ..ResourceSubmission::default()
    };
    let report = provisioned(service.submit(&profiles_only).await.unwrap());

    assert_eq!(report.profiles, vec!["node", "slice"]);
    assert_eq!(report.augmentations.created, 1);
    assert_eq!(report.kpis.created, 4);
}

#[tokio::test]
async fn augmented_and_plain_profiles_on_one_context_deploy_separately() {
    let harness = TestHarness::new();
    let mut submission = sample_submission();
    let kpis = |profile: ProfileDefinition| {
        ["succ", "att", "ratio"]
            .into_iter()
            .fold(profile, |profile, kpi| profile.with_kpi(KpiReference::new(kpi)))
    };
    submission.profile_defs = vec![
        kpis(ProfileDefinition::new("enriched", vec!["nodeFDN".into()])).with_augmentation("cardq"),
        kpis(ProfileDefinition::new("plain", vec!["nodeFDN".into()])),
    ];

    let report = provisioned(harness.service().submit(&submission).await.unwrap());

    assert_eq!(report.kpis.created, 6);
    assert_eq!(report.indexes.created, 2);
    assert!(harness.index.index("acs-index-kpi-cardq-nodefdn-15").is_some());
    assert!(harness.index.index("acs-index-kpi-nodefdn-15").is_some());

    let deployed = harness.kpi.deployed();
    for table in ["kpi_cardq_nodefdn_15", "kpi_nodefdn_15"] {
        let in_table: Vec<_> = deployed.iter().filter(|kpi| kpi.output_table == table).collect();
        assert_eq!(in_table.len(), 3, "{table}");
        let ratio = in_table
            .iter()
            .find(|kpi| kpi.kind == KpiKind::Complex)
            .unwrap();
        for input in in_table.iter().filter(|kpi| kpi.kind == KpiKind::Simple) {
            assert!(ratio.expression.contains(&input.column()), "{}", ratio.expression);
        }
    }
}
