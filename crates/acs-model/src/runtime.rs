//! Deployed (runtime) artifacts
//!
//! These are produced by the KPI compiler and the provisioning phases and
//! owned by the runtime store:
//! - [`DeployedKpi`]: a fully resolved KPI ready for the calculation service
//! - [`EffectiveAugmentation`]: an augmentation as applied, with its profiles
//! - [`IndexDefinition`]: search-index layout for one KPI output table

use crate::augmentation::AugmentationDefinition;
use crate::hash::ContentHash;
use crate::period::AggregationPeriod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Prefix of every deployed KPI name
pub const DEPLOYED_NAME_PREFIX: &str = "acs_";

/// Prefix of every index name
pub const INDEX_NAME_PREFIX: &str = "acs-index-";

/// Context id of an ordered field list (`[nodeFDN, snssai]` → `nodefdn_snssai`)
#[must_use]
pub fn context_id<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|field| field.as_ref().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Output-table scope: the context id, prefixed by the augmentation feeding
/// the table (`cardq` on `[nodeFDN]` → `cardq_nodefdn`)
#[must_use]
pub fn table_scope<S: AsRef<str>>(augmentation: Option<&str>, fields: &[S]) -> String {
    let id = context_id(fields);
    match augmentation {
        Some(augmentation) => format!("{}_{id}", augmentation.to_ascii_lowercase()),
        None => id,
    }
}

/// KPI output table for a scope and period (`kpi_<scope>_<period>`)
#[must_use]
pub fn output_table(scope: &str, period: AggregationPeriod) -> String {
    format!("kpi_{scope}_{period}")
}

/// Qualify each field with a table or schema name
#[must_use]
pub fn qualify<S: AsRef<str>>(table: &str, fields: &[S]) -> Vec<String> {
    fields
        .iter()
        .map(|field| format!("{table}.{}", field.as_ref()))
        .collect()
}

/// Simple or complex deployed KPI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiKind {
    /// Computed from PM counters
    Simple,
    /// Computed from other KPIs
    Complex,
}

/// Deduplication identity: source KPI plus resolved aggregation-element set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KpiIdentity {
    /// Source KPI name
    pub source_kpi: String,
    /// Aggregation elements, as a set
    pub elements: BTreeSet<String>,
}

impl KpiIdentity {
    /// Create identity from a source KPI and its aggregation elements
    #[must_use]
    pub fn new<S: AsRef<str>>(source_kpi: impl Into<String>, elements: &[S]) -> Self {
        Self {
            source_kpi: source_kpi.into(),
            elements: elements.iter().map(|e| e.as_ref().to_string()).collect(),
        }
    }

    /// Content-derived deployed name (`acs_<16 hex>`)
    #[must_use]
    pub fn deployed_name(&self) -> String {
        let parts = std::iter::once(self.source_kpi.as_str())
            .chain(self.elements.iter().map(String::as_str));
        format!(
            "{DEPLOYED_NAME_PREFIX}{}",
            ContentHash::compute_parts(parts).short()
        )
    }
}

impl Display for KpiIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let elements: Vec<&str> = self.elements.iter().map(String::as_str).collect();
        write!(f, "{}[{}]", self.source_kpi, elements.join(","))
    }
}

/// A compiled, deployable KPI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedKpi {
    /// Deployed name (distinct from the source KPI name)
    pub name: String,
    /// Source KPI definition name
    pub source_kpi: String,
    /// Simple or complex
    pub kind: KpiKind,
    /// Resolved expression
    pub expression: String,
    /// Aggregation function
    pub aggregation_type: String,
    /// Qualified aggregation elements, in context order
    pub aggregation_elements: Vec<String>,
    /// Aggregation period
    pub aggregation_period: AggregationPeriod,
    /// Output-table scope, see [`table_scope`]
    pub scope: String,
    /// Output table name
    pub output_table: String,
    /// Unqualified context fields of the output table
    pub context: Vec<String>,
    /// Downstream ordering hint (complex only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_group: Option<String>,
    /// Exposed through the search index
    pub is_visible: bool,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Description
    #[serde(default)]
    pub description: String,
}

impl DeployedKpi {
    /// Deduplication identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> KpiIdentity {
        KpiIdentity::new(&self.source_kpi, &self.aggregation_elements)
    }

    /// Column reference used by dependent complex KPIs (`<table>.<name>`)
    #[inline]
    #[must_use]
    pub fn column(&self) -> String {
        format!("{}.{}", self.output_table, self.name)
    }
}

/// An augmentation as applied downstream, with the profiles using it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveAugmentation {
    /// Definition with placeholders resolved
    pub definition: AugmentationDefinition,
    /// Profiles the augmentation applies to
    pub profiles: BTreeSet<String>,
}

impl EffectiveAugmentation {
    /// Create new effective augmentation
    #[inline]
    #[must_use]
    pub fn new(definition: AugmentationDefinition, profiles: BTreeSet<String>) -> Self {
        Self {
            definition,
            profiles,
        }
    }

    /// Augmentation name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// One indexed KPI value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexValue {
    /// Deployed KPI name (column)
    pub name: String,
    /// Display name
    pub display_name: String,
    /// Description
    pub description: String,
}

/// Search-index layout of one KPI output table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name (`acs-index-<table>`)
    pub name: String,
    /// KPI output table feeding the index
    pub source_table: String,
    /// Context fields written as index keys
    pub context: Vec<String>,
    /// Indexed values, sorted by name
    pub values: Vec<IndexValue>,
}

impl IndexDefinition {
    /// Index name for an output table
    #[inline]
    #[must_use]
    pub fn name_for(table: &str) -> String {
        format!("{INDEX_NAME_PREFIX}{}", table.replace('_', "-"))
    }
}
