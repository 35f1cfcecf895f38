//! Downstream service seams
//!
//! Each downstream system is an async trait so the orchestrator can run
//! against the HTTP clients in [`http`] or against fakes in tests.

pub mod http;

use crate::error::ServiceError;
use acs_model::{AugmentationDefinition, DeployedKpi, IndexDefinition};
use async_trait::async_trait;

pub use http::{HttpAugmentationService, HttpIndexService, HttpKpiService};

/// Augmentation registration service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AugmentationService: Send + Sync {
    /// Registered augmentation; `ServiceError::NotFound` when absent
    async fn get_by_id(&self, id: &str) -> Result<AugmentationDefinition, ServiceError>;

    /// Ids of every registered augmentation
    async fn list_ids(&self) -> Result<Vec<String>, ServiceError>;

    /// Register a new augmentation
    async fn create(&self, augmentation: &AugmentationDefinition) -> Result<(), ServiceError>;

    /// Replace a registered augmentation
    async fn update(&self, augmentation: &AugmentationDefinition) -> Result<(), ServiceError>;

    /// Deregister an augmentation
    async fn delete(&self, id: &str) -> Result<(), ServiceError>;
}

/// KPI calculation service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KpiService: Send + Sync {
    /// Pre-flight probe: succeeds when the definitions endpoint answers
    async fn exists(&self) -> Result<(), ServiceError>;

    /// Bulk create or update
    async fn submit(&self, kpis: &[DeployedKpi]) -> Result<(), ServiceError>;

    /// Bulk delete by deployed name
    async fn delete(&self, names: &[String]) -> Result<(), ServiceError>;
}

/// Search-index service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexService: Send + Sync {
    /// Create an index
    async fn create(&self, index: &IndexDefinition) -> Result<(), ServiceError>;

    /// Replace an index
    async fn update(&self, index: &IndexDefinition) -> Result<(), ServiceError>;

    /// Delete one index
    async fn delete(&self, name: &str) -> Result<(), ServiceError>;

    /// Delete several indexes
    async fn delete_all(&self, names: &[String]) -> Result<(), ServiceError>;
}
