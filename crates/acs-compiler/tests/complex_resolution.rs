//! Complex-KPI resolution across profiles, runs and dependency depths

use acs_compiler::{Action, CompileError, KpiCompiler};
use acs_model::{
    ErrorKind, InputMetric, KpiDefinition, KpiKind, KpiReference, PmDefinition, ProfileDefinition,
};
use acs_store::{Dictionary, DictionaryStore, InMemoryRuntimeStore, RuntimeStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn dictionary() -> Dictionary {
    let dictionary = Dictionary::in_memory();
    dictionary
        .pm_defs
        .save_all(&[
            PmDefinition::new("pmCounters.succ", "5G|PM_COUNTERS|smf_1"),
            PmDefinition::new("pmCounters.att", "5G|PM_COUNTERS|smf_1"),
        ])
        .unwrap();
    dictionary
        .kpi_defs
        .save_all(&[
            KpiDefinition::new("succ", "SUM(s)", "SUM")
                .with_input(InputMetric::pm("pmCounters.succ", "s")),
            KpiDefinition::new("att", "SUM(a)", "SUM")
                .with_input(InputMetric::pm("pmCounters.att", "a")),
            KpiDefinition::new("ratio", "100 * s / a", "SUM")
                .with_input(InputMetric::kpi("succ", "s"))
                .with_input(InputMetric::kpi("att", "a")),
            KpiDefinition::new("ratio_pct", "r / 100", "MAX")
                .with_input(InputMetric::kpi("ratio", "r")),
        ])
        .unwrap();
    dictionary
}

fn node_profile(kpis: &[&str]) -> ProfileDefinition {
    kpis.iter().fold(
        ProfileDefinition::new("node", vec!["nodeFDN".into()]),
        |profile, kpi| profile.with_kpi(KpiReference::new(*kpi)),
    )
}

#[test]
fn complex_input_resolves_from_deployed_artifacts() {
    let runtime = Arc::new(InMemoryRuntimeStore::new());
    let compiler = KpiCompiler::new(dictionary(), runtime.clone());

    let err = compiler
        .calculate_affected_kpis(&[node_profile(&["ratio"])])
        .unwrap_err();
    assert!(matches!(err, CompileError::Unresolved { ref input, .. } if input == "att"));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let simples = compiler
        .calculate_affected_kpis(&[node_profile(&["succ", "att"])])
        .unwrap();
    runtime.save_kpis(&simples.to_write()).unwrap();

    let result = compiler
        .calculate_affected_kpis(&[node_profile(&["ratio"])])
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.kpis[0].artifact.kind, KpiKind::Complex);
    assert_eq!(result.kpis[0].action, Action::Create);
}

#[test]
fn complex_input_resolves_from_another_profile_in_the_same_run() {
    let compiler = KpiCompiler::new(dictionary(), Arc::new(InMemoryRuntimeStore::new()));
    let provider = ProfileDefinition::new("provider", vec!["nodeFDN".into()])
        .with_kpi(KpiReference::new("succ"))
        .with_kpi(KpiReference::new("att"));
    let consumer = ProfileDefinition::new("consumer", vec!["nodeFDN".into()])
        .with_kpi(KpiReference::new("ratio"));

    // consumer is listed first: simple KPIs still resolve before any complex one
    let result = compiler.calculate_affected_kpis(&[consumer, provider]).unwrap();
    assert_eq!(result.count_kind(KpiKind::Simple), 2);
    assert_eq!(result.count_kind(KpiKind::Complex), 1);
}

#[test]
fn complex_of_complex_is_ordered_by_depth() {
    let compiler = KpiCompiler::new(dictionary(), Arc::new(InMemoryRuntimeStore::new()));
    let result = compiler
        .calculate_affected_kpis(&[node_profile(&["ratio_pct", "ratio", "succ", "att"])])
        .unwrap();

    let groups: Vec<(String, Option<String>)> = result
        .artifacts()
        .map(|a| (a.source_kpi.clone(), a.execution_group.clone()))
        .collect();
    assert_eq!(
        groups,
        vec![
            ("succ".to_string(), None),
            ("att".to_string(), None),
            ("ratio".to_string(), Some("acs_complex_1".to_string())),
            ("ratio_pct".to_string(), Some("acs_complex_2".to_string())),
        ]
    );

    let ratio = result.for_source("ratio").next().unwrap();
    let pct = result.for_source("ratio_pct").next().unwrap();
    assert!(pct.artifact.expression.contains(&ratio.artifact.column()));
}

#[test]
fn complex_kpi_with_pm_input_is_rejected() {
    let dictionary = dictionary();
    dictionary
        .kpi_defs
        .save(
            &KpiDefinition::new("bad", "s + x", "SUM")
                .with_input(InputMetric::kpi("succ", "s"))
                .with_input(InputMetric::pm("pmCounters.att", "x")),
        )
        .unwrap();
    let compiler = KpiCompiler::new(dictionary, Arc::new(InMemoryRuntimeStore::new()));
    let err = compiler
        .calculate_affected_kpis(&[node_profile(&["succ", "bad"])])
        .unwrap_err();
    assert!(matches!(err, CompileError::MixedInputs { .. }));
}

#[test]
fn dependency_cycle_is_rejected() {
    let dictionary = dictionary();
    dictionary
        .kpi_defs
        .save_all(&[
            KpiDefinition::new("loop_a", "b", "SUM").with_input(InputMetric::kpi("loop_b", "b")),
            KpiDefinition::new("loop_b", "a", "SUM").with_input(InputMetric::kpi("loop_a", "a")),
        ])
        .unwrap();
    let compiler = KpiCompiler::new(dictionary, Arc::new(InMemoryRuntimeStore::new()));
    let err = compiler
        .calculate_affected_kpis(&[node_profile(&["loop_a"])])
        .unwrap_err();
    assert!(matches!(err, CompileError::Cycle { .. }));
}
