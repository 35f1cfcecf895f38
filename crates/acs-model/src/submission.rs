//! Resource submissions
//!
//! A [`ResourceSubmission`] is the aggregate document operators submit. Every
//! category is optional; an empty category is "absent" and leaves state
//! untouched on merge and contributes nothing to change detection.

use crate::augmentation::AugmentationDefinition;
use crate::definition::Definition;
use crate::error::ValidationError;
use crate::kpi::KpiDefinition;
use crate::pm::{PmDefinition, PmSchemaDefinition};
use crate::profile::ProfileDefinition;
use serde::{Deserialize, Serialize};

/// Aggregate submission of definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSubmission {
    /// PM counter definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pm_defs: Vec<PmDefinition>,
    /// KPI definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kpi_defs: Vec<KpiDefinition>,
    /// Profile definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile_defs: Vec<ProfileDefinition>,
    /// Augmentation definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub augmentations: Vec<AugmentationDefinition>,
    /// PM schema definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pm_schemas: Vec<PmSchemaDefinition>,
}

/// Name-keyed upsert: matching names are replaced in place, new names appended
fn upsert<T: Definition>(master: &mut Vec<T>, incoming: &[T]) {
    for entry in incoming {
        match master.iter_mut().find(|existing| existing.name() == entry.name()) {
            Some(existing) => *existing = entry.clone(),
            None => master.push(entry.clone()),
        }
    }
}

impl ResourceSubmission {
    /// Create empty submission
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With PM definition
    #[inline]
    #[must_use]
    pub fn with_pm_def(mut self, def: PmDefinition) -> Self {
        self.pm_defs.push(def);
        self
    }

    /// With KPI definition
    #[inline]
    #[must_use]
    pub fn with_kpi_def(mut self, def: KpiDefinition) -> Self {
        self.kpi_defs.push(def);
        self
    }

    /// With profile definition
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, def: ProfileDefinition) -> Self {
        self.profile_defs.push(def);
        self
    }

    /// With augmentation definition
    #[inline]
    #[must_use]
    pub fn with_augmentation(mut self, def: AugmentationDefinition) -> Self {
        self.augmentations.push(def);
        self
    }

    /// With PM schema definition
    #[inline]
    #[must_use]
    pub fn with_pm_schema(mut self, def: PmSchemaDefinition) -> Self {
        self.pm_schemas.push(def);
        self
    }

    /// True if every category is absent
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pm_defs.is_empty()
            && self.kpi_defs.is_empty()
            && self.profile_defs.is_empty()
            && self.augmentations.is_empty()
            && self.pm_schemas.is_empty()
    }

    /// Merge another submission into this one (name-keyed upsert per category)
    ///
    /// # Errors
    /// `ValidationError::MissingSubmission` when `other` is `None`
    pub fn merge(&mut self, other: Option<&ResourceSubmission>) -> Result<(), ValidationError> {
        let other = other.ok_or(ValidationError::MissingSubmission)?;
        upsert(&mut self.pm_defs, &other.pm_defs);
        upsert(&mut self.kpi_defs, &other.kpi_defs);
        upsert(&mut self.profile_defs, &other.profile_defs);
        upsert(&mut self.augmentations, &other.augmentations);
        upsert(&mut self.pm_schemas, &other.pm_schemas);
        Ok(())
    }

    /// Explicit PM definitions plus those lifted from PM schemas
    ///
    /// Explicit definitions win over lifted ones of the same name.
    #[must_use]
    pub fn effective_pm_definitions(&self) -> Vec<PmDefinition> {
        let mut defs: Vec<PmDefinition> = self
            .pm_schemas
            .iter()
            .flat_map(PmSchemaDefinition::pm_definitions)
            .collect();
        upsert(&mut defs, &self.pm_defs);
        defs
    }

    /// Validate every definition in the submission
    ///
    /// # Errors
    /// The first `ValidationError` found
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pm_defs.iter().try_for_each(PmDefinition::validate)?;
        self.pm_schemas.iter().try_for_each(PmSchemaDefinition::validate)?;
        self.kpi_defs.iter().try_for_each(KpiDefinition::validate)?;
        self.profile_defs.iter().try_for_each(ProfileDefinition::validate)?;
        self.augmentations
            .iter()
            .try_for_each(AugmentationDefinition::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::{InputMetric, KpiReference};
    use crate::pm::PmCounter;
    use pretty_assertions::assert_eq;

    fn kpi(name: &str, expression: &str) -> KpiDefinition {
        KpiDefinition::new(name, expression, "SUM").with_input(InputMetric::pm("pm.a", "a"))
    }

    #[test]
    fn merge_replaces_matching_and_keeps_others() {
        let mut master = ResourceSubmission::new()
            .with_kpi_def(kpi("k1", "a"))
            .with_kpi_def(kpi("k2", "a"));
        let update = ResourceSubmission::new().with_kpi_def(kpi("k1", "a * 2"));

        master.merge(Some(&update)).unwrap();

        assert_eq!(master.kpi_defs.len(), 2);
        assert_eq!(master.kpi_defs[0].expression, "a * 2");
        assert_eq!(master.kpi_defs[1].expression, "a");
    }

    #[test]
    fn merge_appends_new_names() {
        let mut master = ResourceSubmission::new().with_kpi_def(kpi("k1", "a"));
        let update = ResourceSubmission::new()
            .with_profile(ProfileDefinition::new("p", vec!["nf".into()]));
        master.merge(Some(&update)).unwrap();
        assert_eq!(master.kpi_defs.len(), 1);
        assert_eq!(master.profile_defs.len(), 1);
    }

    #[test]
    fn merge_missing_submission_fails() {
        let mut master = ResourceSubmission::new();
        assert_eq!(
            master.merge(None).unwrap_err(),
            ValidationError::MissingSubmission
        );
    }

    #[test]
    fn merge_empty_submission_is_noop() {
        let mut master = ResourceSubmission::new().with_kpi_def(kpi("k1", "a"));
        let before = master.clone();
        master.merge(Some(&ResourceSubmission::new())).unwrap();
        assert_eq!(master, before);
    }

    #[test]
    fn explicit_pm_defs_win_over_lifted() {
        let schema = PmSchemaDefinition::new("smf", "5G|PM|smf", vec!["nf".into()])
            .with_counter(PmCounter::new("pm.a"))
            .with_counter(PmCounter::new("pm.b"));
        let submission = ResourceSubmission::new()
            .with_pm_schema(schema)
            .with_pm_def(PmDefinition::new("pm.a", "5G|PM|other").with_description("explicit"));

        let defs = submission.effective_pm_definitions();
        assert_eq!(defs.len(), 2);
        let a = defs.iter().find(|d| d.name == "pm.a").unwrap();
        assert_eq!(a.description, "explicit");
    }

    #[test]
    fn validate_reports_first_invalid_definition() {
        let submission = ResourceSubmission::new().with_profile(
            ProfileDefinition::new("bad-name", vec!["nf".into()]).with_kpi(KpiReference::new("k")),
        );
        assert!(matches!(
            submission.validate(),
            Err(ValidationError::InvalidName { .. })
        ));
    }

    #[test]
    fn yaml_document_with_absent_categories() {
        let yaml = r#"
kpi_defs:
  - name: k1
    expression: SUM(a)
    aggregation_type: SUM
    aggregation_period: 60
    input_metrics:
      - { id: pmCounters.x, alias: a, type: PM_DATA }
"#;
        let submission: ResourceSubmission = serde_yaml::from_str(yaml).unwrap();
        assert!(submission.profile_defs.is_empty());
        assert_eq!(submission.kpi_defs.len(), 1);
        assert!(submission.validate().is_ok());
    }
}
