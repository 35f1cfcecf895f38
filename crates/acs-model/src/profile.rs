//! Profile definitions

use crate::definition::{validate_context, validate_name, Definition, DefinitionKey, DefinitionKind};
use crate::error::ValidationError;
use crate::kpi::KpiReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A profile: an aggregation context plus the KPIs computed on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    /// Unique profile name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Ordered aggregation fields
    pub context: Vec<String>,
    /// Referenced KPIs
    #[serde(default)]
    pub kpis: Vec<KpiReference>,
    /// Augmentation applied to this profile's PM data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augmentation: Option<String>,
}

impl ProfileDefinition {
    /// Create new profile
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, context: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            context,
            kpis: Vec::new(),
            augmentation: None,
        }
    }

    /// With KPI reference
    #[inline]
    #[must_use]
    pub fn with_kpi(mut self, reference: KpiReference) -> Self {
        self.kpis.push(reference);
        self
    }

    /// With augmentation
    #[inline]
    #[must_use]
    pub fn with_augmentation(mut self, augmentation: impl Into<String>) -> Self {
        self.augmentation = Some(augmentation.into());
        self
    }

    /// Find the reference to a KPI
    #[inline]
    #[must_use]
    pub fn reference(&self, kpi: &str) -> Option<&KpiReference> {
        self.kpis.iter().find(|reference| reference.kpi == kpi)
    }

    /// Validate name, context and references
    ///
    /// # Errors
    /// `ValidationError` on malformed name, empty context or duplicate reference
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("profile", &self.name)?;
        validate_context(&format!("profile '{}'", self.name), &self.context)?;
        if let Some(augmentation) = &self.augmentation {
            validate_name("augmentation", augmentation)?;
        }
        let mut seen = BTreeSet::new();
        for reference in &self.kpis {
            reference.validate()?;
            if !seen.insert(reference.kpi.as_str()) {
                return Err(ValidationError::DuplicateReference {
                    profile: self.name.clone(),
                    kpi: reference.kpi.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Definition for ProfileDefinition {
    const KIND: DefinitionKind = DefinitionKind::Profile;

    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<DefinitionKey> {
        let kpis = self.kpis.iter().flat_map(|reference| {
            std::iter::once(reference.kpi.as_str()).chain(
                reference
                    .input_metric_overrides
                    .iter()
                    .map(|input_override| input_override.id.as_str()),
            )
        });
        kpis.map(|kpi| DefinitionKey::new(DefinitionKind::KpiDefinition, kpi))
            .chain(
                self.augmentation
                    .iter()
                    .map(|name| DefinitionKey::new(DefinitionKind::Augmentation, name)),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::InputMetricOverride;

    #[test]
    fn dependencies_cover_kpis_overrides_and_augmentation() {
        let profile = ProfileDefinition::new("p", vec!["snssai".into()])
            .with_kpi(
                KpiReference::new("complex")
                    .with_override(InputMetricOverride::new("simple", vec!["nf".into()])),
            )
            .with_augmentation("cardq");

        let deps = profile.dependencies();
        assert_eq!(deps.len(), 3);
        assert!(deps.contains(&DefinitionKey::new(DefinitionKind::Augmentation, "cardq")));
        assert!(deps.contains(&DefinitionKey::new(DefinitionKind::KpiDefinition, "simple")));
    }

    #[test]
    fn duplicate_reference_rejected() {
        let profile = ProfileDefinition::new("p", vec!["snssai".into()])
            .with_kpi(KpiReference::new("k"))
            .with_kpi(KpiReference::new("k"));
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::DuplicateReference { .. })
        ));
    }

    #[test]
    fn empty_context_rejected() {
        let profile = ProfileDefinition::new("p", vec![]);
        assert!(matches!(
            profile.validate(),
            Err(ValidationError::EmptyContext { .. })
        ));
    }
}
