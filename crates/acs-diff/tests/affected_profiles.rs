//! Change detection and affected-profile scenarios against in-memory stores

use acs_diff::DiffEngine;
use acs_model::{
    AugmentationDefinition, AugmentationField, AugmentationRule, EffectiveAugmentation,
    InputMetric, KpiDefinition, KpiReference, MapResolver, PmCounter, PmSchemaDefinition,
    ProfileDefinition, ResourceSubmission,
};
use acs_store::{Dictionary, InMemoryRuntimeStore, RuntimeStore};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;

struct Fixture {
    dictionary: Dictionary,
    runtime: Arc<InMemoryRuntimeStore>,
    engine: DiffEngine,
}

fn fixture() -> Fixture {
    let dictionary = Dictionary::in_memory();
    let runtime = Arc::new(InMemoryRuntimeStore::new());
    let resolver = MapResolver::default().with("cardq.host", "cardq.svc:8080");
    let engine = DiffEngine::new(dictionary.clone(), runtime.clone(), Arc::new(resolver));
    Fixture {
        dictionary,
        runtime,
        engine,
    }
}

fn cardq() -> AugmentationDefinition {
    AugmentationDefinition::new("cardq", "http://${cardq.host}/augment")
        .with_type("core")
        .with_rule(AugmentationRule::new(
            vec!["5G|PM_COUNTERS|smf_1".into()],
            vec![AugmentationField::new(
                vec!["snssai".into()],
                vec!["nsi".into()],
            )],
        ))
}

fn baseline() -> ResourceSubmission {
    ResourceSubmission::new()
        .with_pm_schema(
            PmSchemaDefinition::new("smf_1", "5G|PM_COUNTERS|smf_1", vec!["nodeFDN".into()])
                .with_counter(PmCounter::new("pmCounters.succ"))
                .with_counter(PmCounter::new("pmCounters.att")),
        )
        .with_kpi_def(
            KpiDefinition::new("succ", "SUM(s)", "SUM")
                .with_input(InputMetric::pm("pmCounters.succ", "s")),
        )
        .with_kpi_def(
            KpiDefinition::new("att", "SUM(a)", "SUM")
                .with_input(InputMetric::pm("pmCounters.att", "a")),
        )
        .with_kpi_def(
            KpiDefinition::new("ratio", "100 * s / a", "SUM")
                .with_input(InputMetric::kpi("succ", "s"))
                .with_input(InputMetric::kpi("att", "a")),
        )
        .with_profile(
            ProfileDefinition::new("slice", vec!["nodeFDN".into(), "snssai".into()])
                .with_kpi(KpiReference::new("ratio"))
                .with_augmentation("cardq"),
        )
        .with_profile(
            ProfileDefinition::new("node", vec!["nodeFDN".into()]).with_kpi(KpiReference::new("att")),
        )
        .with_augmentation(cardq())
}

fn names(profiles: Vec<ProfileDefinition>) -> Vec<String> {
    profiles.into_iter().map(|p| p.name).collect()
}

/// Persist the submission and record the effective augmentation the way a
/// successful provisioning run does
fn settle(fx: &Fixture, submission: &ResourceSubmission, resolver: &MapResolver) {
    fx.dictionary.persist(submission).unwrap();
    for augmentation in &submission.augmentations {
        fx.runtime
            .save_effective_augmentation(&EffectiveAugmentation::new(
                augmentation.resolved(resolver),
                BTreeSet::from(["slice".to_string()]),
            ))
            .unwrap();
    }
}

#[test]
fn second_identical_submission_is_unchanged() {
    let fx = fixture();
    let resolver = MapResolver::default().with("cardq.host", "cardq.svc:8080");
    let submission = baseline();

    assert!(fx.engine.is_changed(&submission).unwrap());
    settle(&fx, &submission, &resolver);
    assert!(!fx.engine.is_changed(&submission).unwrap());
    assert!(fx.engine.affected_profiles(&submission).unwrap().is_empty());
}

#[test]
fn first_submission_affects_every_profile_sorted() {
    let fx = fixture();
    assert_eq!(
        names(fx.engine.affected_profiles(&baseline()).unwrap()),
        vec!["node", "slice"]
    );
}

#[test]
fn lifted_pm_change_propagates_through_complex_kpi() {
    let fx = fixture();
    let resolver = MapResolver::default().with("cardq.host", "cardq.svc:8080");
    settle(&fx, &baseline(), &resolver);

    let mut counter = PmCounter::new("pmCounters.succ");
    counter.description = "successful sessions".into();
    let update = ResourceSubmission::new().with_pm_schema(
        PmSchemaDefinition::new("smf_1", "5G|PM_COUNTERS|smf_1", vec!["nodeFDN".into()])
            .with_counter(counter)
            .with_counter(PmCounter::new("pmCounters.att")),
    );

    assert_eq!(names(fx.engine.affected_profiles(&update).unwrap()), vec!["slice"]);
}

#[test]
fn changed_augmentation_url_affects_referencing_profile() {
    let fx = fixture();
    let resolver = MapResolver::default().with("cardq.host", "cardq.svc:8080");
    settle(&fx, &baseline(), &resolver);

    let mut moved = cardq();
    moved.url = "http://${cardq.host}/v2/augment".into();
    let update = ResourceSubmission::new().with_augmentation(moved);

    assert!(fx.engine.is_changed(&update).unwrap());
    assert_eq!(names(fx.engine.affected_profiles(&update).unwrap()), vec!["slice"]);
}

#[test]
fn submitted_profile_version_wins() {
    let fx = fixture();
    let resolver = MapResolver::default().with("cardq.host", "cardq.svc:8080");
    settle(&fx, &baseline(), &resolver);

    let edited = ProfileDefinition::new("node", vec!["nodeFDN".into()])
        .with_kpi(KpiReference::new("att"))
        .with_kpi(KpiReference::new("succ"));
    let update = ResourceSubmission::new().with_profile(edited.clone());

    assert_eq!(fx.engine.affected_profiles(&update).unwrap(), vec![edited]);
}

#[test]
fn new_kpi_referenced_only_by_submitted_profile() {
    let fx = fixture();
    let resolver = MapResolver::default().with("cardq.host", "cardq.svc:8080");
    settle(&fx, &baseline(), &resolver);

    let update = ResourceSubmission::new()
        .with_kpi_def(
            KpiDefinition::new("att_max", "MAX(a)", "MAX")
                .with_input(InputMetric::pm("pmCounters.att", "a")),
        )
        .with_profile(
            ProfileDefinition::new("node", vec!["nodeFDN".into()])
                .with_kpi(KpiReference::new("att"))
                .with_kpi(KpiReference::new("att_max")),
        );

    assert_eq!(names(fx.engine.affected_profiles(&update).unwrap()), vec!["node"]);
}
