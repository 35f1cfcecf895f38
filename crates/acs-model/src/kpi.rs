//! KPI definitions and profile KPI references
//!
//! A KPI whose inputs are all PM counters is *simple*; a KPI with at least
//! one KPI-typed input is *complex*. Input metrics are kept ordered by `id`
//! and deduplicated, whatever order they were submitted in.

use crate::definition::{validate_context, validate_name, Definition, DefinitionKey, DefinitionKind};
use crate::error::ValidationError;
use crate::period::AggregationPeriod;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Type tag of an input metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    /// PM counter input
    #[serde(alias = "pm_data")]
    PmData,
    /// KPI input
    #[serde(alias = "kpi")]
    Kpi,
}

/// Input metric of a KPI; identity is `id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputMetric {
    /// Referenced PM or KPI name
    pub id: String,
    /// Token used for the input inside the expression template
    pub alias: String,
    /// Input category
    #[serde(rename = "type")]
    pub metric_type: MetricType,
}

impl InputMetric {
    /// PM counter input
    #[inline]
    #[must_use]
    pub fn pm(id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: alias.into(),
            metric_type: MetricType::PmData,
        }
    }

    /// KPI input
    #[inline]
    #[must_use]
    pub fn kpi(id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: alias.into(),
            metric_type: MetricType::Kpi,
        }
    }

    /// Dependency key of the referenced definition
    #[inline]
    #[must_use]
    pub fn dependency(&self) -> DefinitionKey {
        let kind = match self.metric_type {
            MetricType::PmData => DefinitionKind::PmDefinition,
            MetricType::Kpi => DefinitionKind::KpiDefinition,
        };
        DefinitionKey::new(kind, &self.id)
    }
}

fn normalize_inputs(mut inputs: Vec<InputMetric>) -> Vec<InputMetric> {
    inputs.sort_by(|a, b| a.id.cmp(&b.id));
    inputs.dedup_by(|a, b| a.id == b.id);
    inputs
}

fn deserialize_inputs<'de, D>(deserializer: D) -> Result<Vec<InputMetric>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<InputMetric>::deserialize(deserializer).map(normalize_inputs)
}

fn default_visible() -> bool {
    true
}

/// A KPI definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiDefinition {
    /// Unique KPI name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Expression template referencing input aliases
    pub expression: String,
    /// Aggregation function (SUM, MAX, ...)
    pub aggregation_type: String,
    /// Default aggregation period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aggregation_period: Option<AggregationPeriod>,
    /// Whether the KPI is exposed through the search index
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    /// Inputs, ordered by id
    #[serde(default, deserialize_with = "deserialize_inputs")]
    input_metrics: Vec<InputMetric>,
}

impl KpiDefinition {
    /// Create new KPI definition
    #[inline]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        aggregation_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            display_name: String::new(),
            expression: expression.into(),
            aggregation_type: aggregation_type.into(),
            aggregation_period: None,
            is_visible: true,
            input_metrics: Vec::new(),
        }
    }

    /// With input metric (kept ordered by id, later duplicates ignored)
    #[must_use]
    pub fn with_input(mut self, input: InputMetric) -> Self {
        if !self.input_metrics.iter().any(|existing| existing.id == input.id) {
            self.input_metrics.push(input);
            self.input_metrics = normalize_inputs(std::mem::take(&mut self.input_metrics));
        }
        self
    }

    /// With default aggregation period
    ///
    /// # Errors
    /// `ValidationError::InvalidAggregationPeriod` outside {15, 60, 1440}
    pub fn with_aggregation_period(mut self, minutes: u32) -> Result<Self, ValidationError> {
        self.set_aggregation_period(minutes)?;
        Ok(self)
    }

    /// Set default aggregation period
    ///
    /// # Errors
    /// `ValidationError::InvalidAggregationPeriod` outside {15, 60, 1440}
    pub fn set_aggregation_period(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.aggregation_period = Some(AggregationPeriod::try_from(minutes)?);
        Ok(())
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// With visibility
    #[inline]
    #[must_use]
    pub fn with_visibility(mut self, is_visible: bool) -> Self {
        self.is_visible = is_visible;
        self
    }

    /// Default aggregation period, if declared
    #[inline]
    #[must_use]
    pub fn aggregation_period(&self) -> Option<AggregationPeriod> {
        self.aggregation_period
    }

    /// Inputs ordered by id
    #[inline]
    #[must_use]
    pub fn input_metrics(&self) -> &[InputMetric] {
        &self.input_metrics
    }

    /// True if at least one input is another KPI
    #[inline]
    #[must_use]
    pub fn is_complex(&self) -> bool {
        self.input_metrics
            .iter()
            .any(|input| input.metric_type == MetricType::Kpi)
    }

    /// Validate name, inputs and aliases
    ///
    /// # Errors
    /// `ValidationError` on malformed name, missing inputs, blank expression or duplicate alias
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("kpi", &self.name)?;
        if self.expression.trim().is_empty() {
            return Err(ValidationError::invalid(&self.name, "expression is empty"));
        }
        if self.aggregation_type.trim().is_empty() {
            return Err(ValidationError::invalid(&self.name, "aggregation type is empty"));
        }
        if self.input_metrics.is_empty() {
            return Err(ValidationError::invalid(&self.name, "no input metrics declared"));
        }
        let mut aliases = BTreeSet::new();
        for input in &self.input_metrics {
            validate_name("input alias", &input.alias)?;
            if !aliases.insert(input.alias.as_str()) {
                return Err(ValidationError::DuplicateAlias {
                    kpi: self.name.clone(),
                    alias: input.alias.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Definition for KpiDefinition {
    const KIND: DefinitionKind = DefinitionKind::KpiDefinition;

    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<DefinitionKey> {
        self.input_metrics.iter().map(InputMetric::dependency).collect()
    }
}

/// Re-binding of one complex-KPI input to another aggregation context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputMetricOverride {
    /// Input metric id (an input KPI name)
    pub id: String,
    /// Context the input is computed on for this profile
    pub context: Vec<String>,
}

impl InputMetricOverride {
    /// Create new override
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, context: Vec<String>) -> Self {
        Self {
            id: id.into(),
            context,
        }
    }
}

/// Reference to a KPI from inside a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiReference {
    /// Referenced KPI name
    #[serde(rename = "ref")]
    pub kpi: String,
    /// Period override for this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aggregation_period: Option<AggregationPeriod>,
    /// Per-profile input re-bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_metric_overrides: Vec<InputMetricOverride>,
}

impl KpiReference {
    /// Create new reference
    #[inline]
    #[must_use]
    pub fn new(kpi: impl Into<String>) -> Self {
        Self {
            kpi: kpi.into(),
            aggregation_period: None,
            input_metric_overrides: Vec::new(),
        }
    }

    /// With period override
    ///
    /// # Errors
    /// `ValidationError::InvalidAggregationPeriod` outside {15, 60, 1440}
    pub fn with_aggregation_period(mut self, minutes: u32) -> Result<Self, ValidationError> {
        self.aggregation_period = Some(AggregationPeriod::try_from(minutes)?);
        Ok(self)
    }

    /// With input override
    #[inline]
    #[must_use]
    pub fn with_override(mut self, input_override: InputMetricOverride) -> Self {
        self.input_metric_overrides.push(input_override);
        self
    }

    /// Period override, if any
    #[inline]
    #[must_use]
    pub fn aggregation_period(&self) -> Option<AggregationPeriod> {
        self.aggregation_period
    }

    /// Override for an input id
    #[inline]
    #[must_use]
    pub fn override_for(&self, input_id: &str) -> Option<&InputMetricOverride> {
        self.input_metric_overrides
            .iter()
            .find(|candidate| candidate.id == input_id)
    }

    /// Validate referenced name and override contexts
    ///
    /// # Errors
    /// `ValidationError` on malformed name or empty override context
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("kpi reference", &self.kpi)?;
        for input_override in &self.input_metric_overrides {
            validate_context(
                &format!("override of '{}' in '{}'", input_override.id, self.kpi),
                &input_override.context,
            )?;
        }
        Ok(())
    }
}
