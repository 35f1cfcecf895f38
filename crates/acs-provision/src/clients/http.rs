//! `reqwest` implementations of the downstream service traits
//!
//! Non-success statuses are classified through [`ServiceError::from_status`];
//! connection failures and timeouts surface as transient errors.

use super::{AugmentationService, IndexService, KpiService};
use crate::error::ServiceError;
use acs_model::{AugmentationDefinition, AugmentationRule, DeployedKpi, IndexDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const AUGMENTATION: &str = "augmentation";
const KPI: &str = "kpi";
const INDEX: &str = "index";

const ARDQ_PATH: &str = "/v1/augmentation/registration/ardq";
const ARDQ_IDS_PATH: &str = "/v1/augmentation/registration/ardq-ids";
const KPI_DEFINITIONS_PATH: &str = "/kpi-handling/model/v1/definitions";
const INDEXER_PATH: &str = "/v1/indexer-info/indexer";

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

fn build_client(service: &'static str, timeout: Duration) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ServiceError::Internal {
            service,
            operation: "client".to_string(),
            message: err.to_string(),
        })
}

fn request_error(service: &'static str, operation: &str, err: &reqwest::Error) -> ServiceError {
    if err.is_decode() || err.is_builder() {
        ServiceError::Internal {
            service,
            operation: operation.to_string(),
            message: err.to_string(),
        }
    } else {
        ServiceError::transport(service, operation, err.to_string())
    }
}

/// Send a request and classify the response status
async fn send(
    service: &'static str,
    operation: &str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ServiceError> {
    let response = request
        .send()
        .await
        .map_err(|err| request_error(service, operation, &err))?;
    let status = response.status();
    debug!(service, operation, status = status.as_u16(), "downstream response");
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::from_status(
        service,
        operation,
        status.as_u16(),
        body,
    ))
}

/// Registration document of the augmentation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArdqRegistration {
    ardq_id: String,
    ardq_url: String,
    #[serde(default)]
    ardq_type: String,
    #[serde(default)]
    rules: Vec<AugmentationRule>,
}

impl From<&AugmentationDefinition> for ArdqRegistration {
    fn from(definition: &AugmentationDefinition) -> Self {
        Self {
            ardq_id: definition.name.clone(),
            ardq_url: definition.url.clone(),
            ardq_type: definition.augmentation_type.clone(),
            rules: definition.rules.clone(),
        }
    }
}

impl From<ArdqRegistration> for AugmentationDefinition {
    fn from(registration: ArdqRegistration) -> Self {
        Self {
            name: registration.ardq_id,
            url: registration.ardq_url,
            augmentation_type: registration.ardq_type,
            rules: registration.rules,
        }
    }
}

/// Augmentation registration over HTTP
#[derive(Debug, Clone)]
pub struct HttpAugmentationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAugmentationService {
    /// Create client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(AUGMENTATION, timeout)?,
            base_url: base_url.into(),
        })
    }

    fn registration_url(&self, id: &str) -> String {
        endpoint(&self.base_url, &format!("{ARDQ_PATH}/{id}"))
    }
}

#[async_trait]
impl AugmentationService for HttpAugmentationService {
    async fn get_by_id(&self, id: &str) -> Result<AugmentationDefinition, ServiceError> {
        let response = send(
            AUGMENTATION,
            "get",
            self.client.get(self.registration_url(id)),
        )
        .await?;
        let registration: ArdqRegistration = response
            .json()
            .await
            .map_err(|err| request_error(AUGMENTATION, "get", &err))?;
        Ok(registration.into())
    }

    async fn list_ids(&self) -> Result<Vec<String>, ServiceError> {
        let response = send(
            AUGMENTATION,
            "list_ids",
            self.client.get(endpoint(&self.base_url, ARDQ_IDS_PATH)),
        )
        .await?;
        response
            .json()
            .await
            .map_err(|err| request_error(AUGMENTATION, "list_ids", &err))
    }

    async fn create(&self, augmentation: &AugmentationDefinition) -> Result<(), ServiceError> {
        let body = ArdqRegistration::from(augmentation);
        send(
            AUGMENTATION,
            "create",
            self.client.post(endpoint(&self.base_url, ARDQ_PATH)).json(&body),
        )
        .await
        .map(drop)
    }

    async fn update(&self, augmentation: &AugmentationDefinition) -> Result<(), ServiceError> {
        let body = ArdqRegistration::from(augmentation);
        send(
            AUGMENTATION,
            "update",
            self.client.put(endpoint(&self.base_url, ARDQ_PATH)).json(&body),
        )
        .await
        .map(drop)
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        send(
            AUGMENTATION,
            "delete",
            self.client.delete(self.registration_url(id)),
        )
        .await
        .map(drop)
    }
}

#[derive(Serialize)]
struct KpiDefinitionsBody<'a> {
    kpi_definitions: &'a [DeployedKpi],
}

/// KPI calculation service over HTTP
#[derive(Debug, Clone)]
pub struct HttpKpiService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpKpiService {
    /// Create client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(KPI, timeout)?,
            base_url: base_url.into(),
        })
    }

    fn definitions_url(&self) -> String {
        endpoint(&self.base_url, KPI_DEFINITIONS_PATH)
    }
}

#[async_trait]
impl KpiService for HttpKpiService {
    async fn exists(&self) -> Result<(), ServiceError> {
        send(KPI, "probe", self.client.get(self.definitions_url()))
            .await
            .map(drop)
    }

    async fn submit(&self, kpis: &[DeployedKpi]) -> Result<(), ServiceError> {
        let body = KpiDefinitionsBody {
            kpi_definitions: kpis,
        };
        send(
            KPI,
            "submit",
            self.client.put(self.definitions_url()).json(&body),
        )
        .await
        .map(drop)
    }

    async fn delete(&self, names: &[String]) -> Result<(), ServiceError> {
        send(
            KPI,
            "delete",
            self.client.delete(self.definitions_url()).json(names),
        )
        .await
        .map(drop)
    }
}

/// Search-index service over HTTP
#[derive(Debug, Clone)]
pub struct HttpIndexService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIndexService {
    /// Create client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(INDEX, timeout)?,
            base_url: base_url.into(),
        })
    }

    fn indexer_url(&self) -> String {
        endpoint(&self.base_url, INDEXER_PATH)
    }
}

#[async_trait]
impl IndexService for HttpIndexService {
    async fn create(&self, index: &IndexDefinition) -> Result<(), ServiceError> {
        send(
            INDEX,
            "create",
            self.client.post(self.indexer_url()).json(index),
        )
        .await
        .map(drop)
    }

    async fn update(&self, index: &IndexDefinition) -> Result<(), ServiceError> {
        send(INDEX, "update", self.client.put(self.indexer_url()).json(index))
            .await
            .map(drop)
    }

    async fn delete(&self, name: &str) -> Result<(), ServiceError> {
        send(
            INDEX,
            "delete",
            self.client.delete(self.indexer_url()).query(&[("name", name)]),
        )
        .await
        .map(drop)
    }

    async fn delete_all(&self, names: &[String]) -> Result<(), ServiceError> {
        send(
            INDEX,
            "delete_all",
            self.client
                .delete(format!("{}/bulk", self.indexer_url()))
                .json(names),
        )
        .await
        .map(drop)
    }
}
