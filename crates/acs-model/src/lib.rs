//! ACS Definition Model
//!
//! Typed definitions submitted by operators and the runtime artifacts derived
//! from them.
//!
//! # Core Concepts
//!
//! - [`ResourceSubmission`]: aggregate bundle of definitions with name-keyed merge
//! - [`Definition`]: common trait of every submitted category
//! - [`KpiDefinition`] / [`ProfileDefinition`]: what to compute and on which context
//! - [`AggregationPeriod`]: the permitted 15 / 60 / 1440 minute windows
//! - [`DeployedKpi`]: a compiled KPI with its content-derived name
//! - [`ProvisioningState`]: status record of one provisioning run
//!
//! # Example
//!
//! ```rust,ignore
//! use acs_model::prelude::*;
//!
//! let submission: ResourceSubmission = serde_yaml::from_str(doc)?;
//! submission.validate()?;
//! ```

#![warn(unreachable_pub)]

pub mod augmentation;
pub mod definition;
pub mod error;
pub mod hash;
pub mod kpi;
pub mod period;
pub mod placeholder;
pub mod pm;
pub mod profile;
pub mod runtime;
pub mod state;
pub mod submission;

pub use augmentation::{AugmentationDefinition, AugmentationField, AugmentationRule};
pub use definition::{validate_context, validate_name, Definition, DefinitionKey, DefinitionKind};
pub use error::{ErrorKind, ValidationError};
pub use hash::ContentHash;
pub use kpi::{InputMetric, InputMetricOverride, KpiDefinition, KpiReference, MetricType};
pub use period::AggregationPeriod;
pub use placeholder::{EnvResolver, MapResolver, PlaceholderResolver};
pub use pm::{schema_name, PmCounter, PmDefinition, PmSchemaDefinition};
pub use profile::ProfileDefinition;
pub use runtime::{
    context_id, output_table, qualify, table_scope, DeployedKpi, EffectiveAugmentation,
    IndexDefinition, IndexValue, KpiIdentity, KpiKind,
};
pub use state::{
    allowed_transitions, validate_transition, ProvisioningState, ProvisioningStatus,
    StateTransitionError,
};
pub use submission::ResourceSubmission;

/// Commonly used types
pub mod prelude {
    pub use crate::{
        AggregationPeriod, AugmentationDefinition, Definition, DefinitionKey, DefinitionKind,
        DeployedKpi, ErrorKind, InputMetric, KpiDefinition, KpiReference, PmDefinition,
        PmSchemaDefinition, ProfileDefinition, ResourceSubmission, ValidationError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
