//! Common definition trait and dependency keys
//!
//! Every submitted category implements [`Definition`] so stores and the diff
//! engine can treat them uniformly: name-keyed identity, structural equality
//! and declared dependencies on other definitions.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z0-9][A-Za-z0-9_]*$").expect("name pattern is valid"));

/// Definition categories of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    /// PM counter definition
    PmDefinition,
    /// KPI definition
    KpiDefinition,
    /// Profile definition
    Profile,
    /// Augmentation definition
    Augmentation,
    /// PM schema definition
    PmSchema,
}

impl DefinitionKind {
    /// Stable label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PmDefinition => "pm_definition",
            Self::KpiDefinition => "kpi_definition",
            Self::Profile => "profile",
            Self::Augmentation => "augmentation",
            Self::PmSchema => "pm_schema",
        }
    }
}

impl Display for DefinitionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed reference to a definition (category + name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionKey {
    /// Category
    pub kind: DefinitionKind,
    /// Name within the category
    pub name: String,
}

impl DefinitionKey {
    /// Create new key
    #[inline]
    #[must_use]
    pub fn new(kind: DefinitionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl Display for DefinitionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A name-keyed, structurally comparable definition
pub trait Definition:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Category of this definition
    const KIND: DefinitionKind;

    /// Unique name within the category
    fn name(&self) -> &str;

    /// Definitions this one depends on (one hop)
    fn dependencies(&self) -> Vec<DefinitionKey> {
        Vec::new()
    }

    /// Typed key of this definition
    #[inline]
    fn key(&self) -> DefinitionKey {
        DefinitionKey::new(Self::KIND, self.name())
    }
}

/// Check a name against `^[A-Za-z0-9][A-Za-z0-9_]*$`
///
/// # Errors
/// `ValidationError::InvalidName` when the name does not match
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), ValidationError> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Check that a context field list is non-empty and its fields are named
///
/// # Errors
/// `ValidationError::EmptyContext` or `ValidationError::InvalidName`
pub fn validate_context(owner: &str, context: &[String]) -> Result<(), ValidationError> {
    if context.is_empty() {
        return Err(ValidationError::EmptyContext {
            owner: owner.to_string(),
        });
    }
    context
        .iter()
        .try_for_each(|field| validate_name("context field", field))
}
