//! In-memory downstream services with scripted failures
//!
//! Every call is appended to a call log as `<operation>:<subject>` before any
//! scripted failure for that operation is consumed.

use acs_model::{AugmentationDefinition, DeployedKpi, IndexDefinition};
use acs_provision::{AugmentationService, IndexService, KpiService, ServiceError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};

#[derive(Debug, Default)]
struct Script {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, VecDeque<ServiceError>>>,
}

impl Script {
    fn call(&self, operation: &'static str, subject: &str) -> Result<(), ServiceError> {
        self.calls.lock().push(format!("{operation}:{subject}"));
        match self
            .failures
            .lock()
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&self, operation: &'static str, times: usize, error: &ServiceError) {
        self.failures
            .lock()
            .entry(operation)
            .or_default()
            .extend(std::iter::repeat(error.clone()).take(times));
    }

    fn count(&self, operation: &str) -> usize {
        let prefix = format!("{operation}:");
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }
}

macro_rules! scripted {
    ($fake:ty) => {
        impl $fake {
            /// Fail the next `times` calls of `operation` with `error`
            pub fn fail(&self, operation: &'static str, times: usize, error: ServiceError) {
                self.script.fail(operation, times, &error);
            }

            /// Number of calls of `operation`, failed ones included
            #[must_use]
            pub fn calls(&self, operation: &str) -> usize {
                self.script.count(operation)
            }

            /// Every call so far, in order
            #[must_use]
            pub fn call_log(&self) -> Vec<String> {
                self.script.calls.lock().clone()
            }
        }
    };
}

/// Augmentation registry keyed by id
#[derive(Debug, Default)]
pub struct FakeAugmentationService {
    script: Script,
    registry: Mutex<BTreeMap<String, AugmentationDefinition>>,
}

scripted!(FakeAugmentationService);

impl FakeAugmentationService {
    /// Registered augmentation
    #[must_use]
    pub fn registered(&self, id: &str) -> Option<AugmentationDefinition> {
        self.registry.lock().get(id).cloned()
    }
}

#[async_trait]
impl AugmentationService for FakeAugmentationService {
    async fn get_by_id(&self, id: &str) -> Result<AugmentationDefinition, ServiceError> {
        self.script.call("get", id)?;
        self.registered(id)
            .ok_or_else(|| ServiceError::from_status("augmentation", "get", 404, ""))
    }

    async fn list_ids(&self) -> Result<Vec<String>, ServiceError> {
        self.script.call("list_ids", "")?;
        Ok(self.registry.lock().keys().cloned().collect())
    }

    async fn create(&self, augmentation: &AugmentationDefinition) -> Result<(), ServiceError> {
        self.script.call("create", &augmentation.name)?;
        let mut registry = self.registry.lock();
        if registry.contains_key(&augmentation.name) {
            return Err(ServiceError::from_status("augmentation", "create", 409, "exists"));
        }
        registry.insert(augmentation.name.clone(), augmentation.clone());
        Ok(())
    }

    async fn update(&self, augmentation: &AugmentationDefinition) -> Result<(), ServiceError> {
        self.script.call("update", &augmentation.name)?;
        let mut registry = self.registry.lock();
        match registry.get_mut(&augmentation.name) {
            Some(existing) => {
                *existing = augmentation.clone();
                Ok(())
            }
            None => Err(ServiceError::from_status("augmentation", "update", 404, "")),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.script.call("delete", id)?;
        self.registry
            .lock()
            .remove(id)
            .map(drop)
            .ok_or_else(|| ServiceError::from_status("augmentation", "delete", 404, ""))
    }
}

/// KPI calculator keeping deployed definitions by name
#[derive(Debug, Default)]
pub struct FakeKpiService {
    script: Script,
    deployed: Mutex<BTreeMap<String, DeployedKpi>>,
}

scripted!(FakeKpiService);

impl FakeKpiService {
    /// Deployed KPIs, sorted by name
    #[must_use]
    pub fn deployed(&self) -> Vec<DeployedKpi> {
        self.deployed.lock().values().cloned().collect()
    }
}

#[async_trait]
impl KpiService for FakeKpiService {
    async fn exists(&self) -> Result<(), ServiceError> {
        self.script.call("probe", "")
    }

    async fn submit(&self, kpis: &[DeployedKpi]) -> Result<(), ServiceError> {
        self.script.call("submit", &kpis.len().to_string())?;
        let mut deployed = self.deployed.lock();
        for kpi in kpis {
            deployed.insert(kpi.name.clone(), kpi.clone());
        }
        Ok(())
    }

    async fn delete(&self, names: &[String]) -> Result<(), ServiceError> {
        self.script.call("delete", &names.join(","))?;
        let mut deployed = self.deployed.lock();
        for name in names {
            deployed.remove(name);
        }
        Ok(())
    }
}

/// Search-index service keeping definitions by name
#[derive(Debug, Default)]
pub struct FakeIndexService {
    script: Script,
    indexes: Mutex<BTreeMap<String, IndexDefinition>>,
}

scripted!(FakeIndexService);

impl FakeIndexService {
    /// Index by name
    #[must_use]
    pub fn index(&self, name: &str) -> Option<IndexDefinition> {
        self.indexes.lock().get(name).cloned()
    }

    /// Number of indexes held
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.lock().len()
    }

    /// True when no index is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.lock().is_empty()
    }
}

#[async_trait]
impl IndexService for FakeIndexService {
    async fn create(&self, index: &IndexDefinition) -> Result<(), ServiceError> {
        self.script.call("create", &index.name)?;
        self.indexes.lock().insert(index.name.clone(), index.clone());
        Ok(())
    }

    async fn update(&self, index: &IndexDefinition) -> Result<(), ServiceError> {
        self.script.call("update", &index.name)?;
        self.indexes.lock().insert(index.name.clone(), index.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), ServiceError> {
        self.script.call("delete", name)?;
        self.indexes
            .lock()
            .remove(name)
            .map(drop)
            .ok_or_else(|| ServiceError::from_status("index", "delete", 404, ""))
    }

    async fn delete_all(&self, names: &[String]) -> Result<(), ServiceError> {
        self.script.call("delete_all", &names.join(","))?;
        let mut indexes = self.indexes.lock();
        for name in names {
            indexes.remove(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let kpi = FakeKpiService::default();
        kpi.fail("probe", 2, ServiceError::from_status("kpi", "probe", 503, ""));

        assert!(kpi.exists().await.is_err());
        assert!(kpi.exists().await.is_err());
        assert!(kpi.exists().await.is_ok());
        assert_eq!(kpi.calls("probe"), 3);
    }

    #[tokio::test]
    async fn missing_augmentation_is_not_found() {
        let augmentation = FakeAugmentationService::default();
        let err = augmentation.get_by_id("cardq").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(augmentation.call_log(), vec!["get:cardq"]);
    }
}
