//! Sample definitions shared by integration tests
//!
//! Two profiles over one SMF schema:
//! - `slice` on `[nodeFDN, snssai]`: `succ`, `att` and the complex `ratio`,
//!   augmented by `cardq`
//! - `node` on `[nodeFDN]`: `att`

use acs_model::{
    AugmentationDefinition, AugmentationField, AugmentationRule, InputMetric, KpiDefinition,
    KpiReference, MapResolver, PmCounter, PmSchemaDefinition, ProfileDefinition,
    ResourceSubmission,
};

/// Host the `cardq` URL placeholder resolves to
pub const CARDQ_HOST: &str = "cardq.svc:8080";

/// YAML form of [`sample_submission`]
pub const SAMPLE_SUBMISSION_YAML: &str = r#"
pm_schemas:
  - name: smf_1
    uri: "5G|PM_COUNTERS|smf_1"
    context: [nodeFDN]
    counters:
      - name: pmCounters.succ
      - name: pmCounters.att
augmentations:
  - name: cardq
    url: "http://${cardq.host}/augment"
    type: core
    rules:
      - input_schema: "5G|PM_COUNTERS|smf_1"
        fields:
          - input: [snssai]
            output: nsi
kpi_defs:
  - name: succ
    expression: SUM(s)
    aggregation_type: SUM
    input_metrics:
      - { id: pmCounters.succ, alias: s, type: PM_DATA }
  - name: att
    expression: SUM(a)
    aggregation_type: SUM
    input_metrics:
      - { id: pmCounters.att, alias: a, type: PM_DATA }
  - name: ratio
    expression: 100 * s / a
    aggregation_type: SUM
    input_metrics:
      - { id: succ, alias: s, type: KPI }
      - { id: att, alias: a, type: KPI }
profile_defs:
  - name: slice
    context: [nodeFDN, snssai]
    augmentation: cardq
    kpis:
      - ref: succ
      - ref: att
      - ref: ratio
  - name: node
    context: [nodeFDN]
    kpis:
      - ref: att
"#;

/// The `cardq` augmentation with its URL placeholder unresolved
#[must_use]
pub fn cardq() -> AugmentationDefinition {
    AugmentationDefinition::new("cardq", "http://${cardq.host}/augment")
        .with_type("core")
        .with_rule(AugmentationRule::new(
            vec!["5G|PM_COUNTERS|smf_1".into()],
            vec![AugmentationField::new(vec!["snssai".into()], vec!["nsi".into()])],
        ))
}

/// Resolver for the `cardq.host` placeholder
#[must_use]
pub fn resolver() -> MapResolver {
    MapResolver::default().with("cardq.host", CARDQ_HOST)
}

/// The `slice` profile
#[must_use]
pub fn slice_profile() -> ProfileDefinition {
    ProfileDefinition::new("slice", vec!["nodeFDN".into(), "snssai".into()])
        .with_kpi(KpiReference::new("succ"))
        .with_kpi(KpiReference::new("att"))
        .with_kpi(KpiReference::new("ratio"))
        .with_augmentation("cardq")
}

/// The `node` profile
#[must_use]
pub fn node_profile() -> ProfileDefinition {
    ProfileDefinition::new("node", vec!["nodeFDN".into()]).with_kpi(KpiReference::new("att"))
}

/// Full sample submission
#[must_use]
pub fn sample_submission() -> ResourceSubmission {
    ResourceSubmission::new()
        .with_pm_schema(
            PmSchemaDefinition::new("smf_1", "5G|PM_COUNTERS|smf_1", vec!["nodeFDN".into()])
                .with_counter(PmCounter::new("pmCounters.succ"))
                .with_counter(PmCounter::new("pmCounters.att")),
        )
        .with_augmentation(cardq())
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
        .with_profile(slice_profile())
        .with_profile(node_profile())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn yaml_matches_builder() {
        let parsed: ResourceSubmission = serde_yaml::from_str(SAMPLE_SUBMISSION_YAML).unwrap();
        assert_eq!(parsed, sample_submission());
        assert!(parsed.validate().is_ok());
    }
}
