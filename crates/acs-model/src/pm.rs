//! PM counter and PM schema definitions

use crate::definition::{validate_context, validate_name, Definition, DefinitionKind};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Schema name of a schema reference
///
/// References look like `5G|PM_COUNTERS|smf_nsmf_pdu_session_1`; the schema
/// name is the last `|` or `/` separated segment.
#[inline]
#[must_use]
pub fn schema_name(reference: &str) -> &str {
    reference
        .rsplit(|c| c == '|' || c == '/')
        .next()
        .unwrap_or(reference)
}

/// A PM counter definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmDefinition {
    /// Dotted counter path, e.g. `pmCounters.create_sm_context_resp_succ`
    pub name: String,
    /// Schema reference the counter is published on
    pub source: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl PmDefinition {
    /// Create new PM definition
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            description: String::new(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Schema name derived from `source`
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &str {
        schema_name(&self.source)
    }

    /// Validate name segments and source
    ///
    /// # Errors
    /// `ValidationError` if any dotted segment is malformed or the source is empty
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.name
            .split('.')
            .try_for_each(|segment| validate_name("pm definition", segment))
            .map_err(|_| ValidationError::InvalidName {
                kind: "pm definition",
                name: self.name.clone(),
            })?;
        if self.schema().is_empty() {
            return Err(ValidationError::invalid(&self.name, "source schema is empty"));
        }
        Ok(())
    }
}

impl Definition for PmDefinition {
    const KIND: DefinitionKind = DefinitionKind::PmDefinition;

    fn name(&self) -> &str {
        &self.name
    }
}

/// A counter published by a PM schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmCounter {
    /// Dotted counter path
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl PmCounter {
    /// Create new counter
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

/// A PM schema and the counters it publishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmSchemaDefinition {
    /// Schema name
    pub name: String,
    /// Schema reference, e.g. `5G|PM_COUNTERS|smf_nsmf_pdu_session_1`
    pub uri: String,
    /// Context fields carried by every record
    pub context: Vec<String>,
    /// Published counters
    #[serde(default)]
    pub counters: Vec<PmCounter>,
}

impl PmSchemaDefinition {
    /// Create new schema
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, uri: impl Into<String>, context: Vec<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            context,
            counters: Vec::new(),
        }
    }

    /// With counter
    #[inline]
    #[must_use]
    pub fn with_counter(mut self, counter: PmCounter) -> Self {
        self.counters.push(counter);
        self
    }

    /// Lift every counter into a PM definition sourced from this schema
    #[must_use]
    pub fn pm_definitions(&self) -> Vec<PmDefinition> {
        self.counters
            .iter()
            .map(|counter| {
                PmDefinition::new(&counter.name, &self.uri).with_description(&counter.description)
            })
            .collect()
    }

    /// Validate name and context
    ///
    /// # Errors
    /// `ValidationError` on malformed name or empty context
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("pm schema", &self.name)?;
        validate_context(&format!("pm schema '{}'", self.name), &self.context)?;
        self.pm_definitions().iter().try_for_each(PmDefinition::validate)
    }
}

impl Definition for PmSchemaDefinition {
    const KIND: DefinitionKind = DefinitionKind::PmSchema;

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_name_from_reference() {
        assert_eq!(schema_name("5G|PM_COUNTERS|smf_1"), "smf_1");
        assert_eq!(schema_name("smf_1"), "smf_1");
        assert_eq!(schema_name("kafka/topic/smf_2"), "smf_2");
    }

    #[test]
    fn counters_lift_into_pm_definitions() {
        let schema = PmSchemaDefinition::new("smf_1", "5G|PM_COUNTERS|smf_1", vec!["snssai".into()])
            .with_counter(PmCounter::new("pmCounters.create_sm_context_req"));

        let defs = schema.pm_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "pmCounters.create_sm_context_req");
        assert_eq!(defs[0].source, "5G|PM_COUNTERS|smf_1");
        assert_eq!(defs[0].schema(), "smf_1");
    }

    #[test]
    fn pm_name_segments_validated() {
        assert!(PmDefinition::new("pmCounters.ok_name", "s|smf").validate().is_ok());
        assert!(PmDefinition::new("pmCounters..bad", "s|smf").validate().is_err());
        assert!(PmDefinition::new("pmCounters.x", "s|").validate().is_err());
    }
}
