//! Augmentation definitions
//!
//! An augmentation enriches records of one or more input schemas with extra
//! fields before KPI computation. Rules accept two document forms for the
//! input schema (`input_schema` / `input_schemas`) and for outputs
//! (`output` / `output_fields`); both are normalized to lists.

use crate::definition::{validate_name, Definition, DefinitionKind};
use crate::error::ValidationError;
use crate::placeholder::PlaceholderResolver;
use serde::{Deserialize, Serialize};

/// Document form of a field mapping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawField {
    #[serde(default)]
    input: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_fields: Option<Vec<String>>,
}

/// Field mapping: one-or-many inputs to one-or-many outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct AugmentationField {
    /// Input record fields
    pub inputs: Vec<String>,
    /// Produced fields
    pub outputs: Vec<String>,
}

impl AugmentationField {
    /// Create new field mapping
    #[inline]
    #[must_use]
    pub fn new(inputs: Vec<String>, outputs: Vec<String>) -> Self {
        Self { inputs, outputs }
    }
}

impl From<RawField> for AugmentationField {
    fn from(raw: RawField) -> Self {
        let mut outputs = raw.output.into_iter().collect::<Vec<_>>();
        outputs.extend(raw.output_fields.unwrap_or_default());
        Self {
            inputs: raw.input,
            outputs,
        }
    }
}

impl From<AugmentationField> for RawField {
    fn from(field: AugmentationField) -> Self {
        Self {
            input: field.inputs,
            output: None,
            output_fields: Some(field.outputs),
        }
    }
}

/// Document form of a rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_schemas: Option<Vec<String>>,
    #[serde(default)]
    fields: Vec<AugmentationField>,
}

/// Augmentation rule: which schemas it applies to and what it adds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawRule", into = "RawRule")]
pub struct AugmentationRule {
    /// Input schema references
    pub input_schemas: Vec<String>,
    /// Field mappings
    pub fields: Vec<AugmentationField>,
}

impl AugmentationRule {
    /// Create new rule
    #[inline]
    #[must_use]
    pub fn new(input_schemas: Vec<String>, fields: Vec<AugmentationField>) -> Self {
        Self {
            input_schemas,
            fields,
        }
    }
}

impl From<RawRule> for AugmentationRule {
    fn from(raw: RawRule) -> Self {
        let mut input_schemas = raw.input_schema.into_iter().collect::<Vec<_>>();
        input_schemas.extend(raw.input_schemas.unwrap_or_default());
        Self {
            input_schemas,
            fields: raw.fields,
        }
    }
}

impl From<AugmentationRule> for RawRule {
    fn from(rule: AugmentationRule) -> Self {
        Self {
            input_schema: None,
            input_schemas: Some(rule.input_schemas),
            fields: rule.fields,
        }
    }
}

/// An augmentation definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationDefinition {
    /// Unique augmentation name (also its downstream id)
    pub name: String,
    /// Enrichment service URL; may contain `${...}` placeholders
    pub url: String,
    /// Augmentation type, e.g. `core`
    #[serde(rename = "type", default)]
    pub augmentation_type: String,
    /// Rules
    #[serde(default)]
    pub rules: Vec<AugmentationRule>,
}

impl AugmentationDefinition {
    /// Create new augmentation
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            augmentation_type: String::new(),
            rules: Vec::new(),
        }
    }

    /// With type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, augmentation_type: impl Into<String>) -> Self {
        self.augmentation_type = augmentation_type.into();
        self
    }

    /// With rule
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, rule: AugmentationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Copy with URL placeholders resolved
    #[must_use]
    pub fn resolved(&self, resolver: &dyn PlaceholderResolver) -> Self {
        Self {
            url: resolver.resolve(&self.url),
            ..self.clone()
        }
    }

    /// All fields produced by this augmentation
    #[must_use]
    pub fn output_fields(&self) -> Vec<&str> {
        self.rules
            .iter()
            .flat_map(|rule| rule.fields.iter())
            .flat_map(|field| field.outputs.iter().map(String::as_str))
            .collect()
    }

    /// Validate name, url and rule forms
    ///
    /// # Errors
    /// `ValidationError::InvalidAugmentationRule` when a rule lacks an input
    /// schema form or a field lacks an output form
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("augmentation", &self.name)?;
        let rule_error = |reason: &str| ValidationError::InvalidAugmentationRule {
            augmentation: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.url.trim().is_empty() {
            return Err(rule_error("url is empty"));
        }
        if self.rules.is_empty() {
            return Err(rule_error("at least one rule is required"));
        }
        for rule in &self.rules {
            if rule.input_schemas.is_empty() {
                return Err(rule_error(
                    "rule requires an input schema (`input_schema` or `input_schemas`)",
                ));
            }
            if rule.fields.is_empty() {
                return Err(rule_error("rule declares no fields"));
            }
            for field in &rule.fields {
                if field.outputs.is_empty() {
                    return Err(rule_error(
                        "field requires an output (`output` or `output_fields`)",
                    ));
                }
                if field.inputs.is_empty() {
                    return Err(rule_error("field requires at least one input"));
                }
            }
        }
        Ok(())
    }
}

impl Definition for AugmentationDefinition {
    const KIND: DefinitionKind = DefinitionKind::Augmentation;

    fn name(&self) -> &str {
        &self.name
    }
}
