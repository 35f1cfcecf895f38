//! Provisioning configuration
//!
//! Loaded from TOML; every section and key is optional and falls back to
//! [`ProvisioningConfig::default`].
//!
//! ```toml
//! default_aggregation_period = 60
//! state_dir = "/var/lib/acs"
//!
//! [services]
//! kpi_url = "http://eric-oss-pm-stats-calculator:8080"
//!
//! [retry]
//! kpi_max_attempts = 10
//! delay_ms = 2000
//! ```

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use acs_model::AggregationPeriod;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base URLs of the downstream services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoints {
    /// Augmentation registration service
    pub augmentation_url: String,
    /// KPI calculation service
    pub kpi_url: String,
    /// Search-index service
    pub index_url: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            augmentation_url: "http://localhost:8081".to_string(),
            kpi_url: "http://localhost:8082".to_string(),
            index_url: "http://localhost:8083".to_string(),
        }
    }
}

/// Retry settings for downstream calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per downstream call
    pub max_attempts: u32,
    /// Attempts for KPI submission
    pub kpi_max_attempts: u32,
    /// Delay before the second attempt
    pub delay_ms: u64,
    /// Delay growth; `1.0` keeps the delay fixed
    pub backoff_multiplier: f64,
    /// Upper bound on the delay
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::DEFAULT_ATTEMPTS,
            kpi_max_attempts: RetryPolicy::KPI_SUBMISSION_ATTEMPTS,
            delay_ms: 1000,
            backoff_multiplier: 1.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetrySettings {
    fn policy(&self, max_attempts: u32) -> RetryPolicy {
        let delay = Duration::from_millis(self.delay_ms);
        if self.backoff_multiplier > 1.0 {
            RetryPolicy::exponential(
                max_attempts,
                delay,
                self.backoff_multiplier,
                Duration::from_millis(self.max_delay_ms),
            )
        } else {
            RetryPolicy::fixed(max_attempts, delay)
        }
    }
}

/// Configuration of the provisioning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Downstream base URLs
    pub services: ServiceEndpoints,
    /// Per-request timeout
    pub request_timeout_ms: u64,
    /// Retry settings
    pub retry: RetrySettings,
    /// Period used when neither the reference nor the KPI sets one
    pub default_aggregation_period: AggregationPeriod,
    /// Directory of the file-backed stores; in-memory when unset
    pub state_dir: Option<PathBuf>,
    /// Compile and report without calling downstream services
    pub dry_run: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            services: ServiceEndpoints::default(),
            request_timeout_ms: 30_000,
            retry: RetrySettings::default(),
            default_aggregation_period: AggregationPeriod::default(),
            state_dir: None,
            dry_run: false,
        }
    }
}

impl ProvisioningConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&document)
    }

    /// Reject values no run could work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 || self.retry.kpi_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// With downstream endpoints
    #[inline]
    #[must_use]
    pub fn with_services(mut self, services: ServiceEndpoints) -> Self {
        self.services = services;
        self
    }

    /// With retry settings
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// With default aggregation period
    #[inline]
    #[must_use]
    pub fn with_default_period(mut self, period: AggregationPeriod) -> Self {
        self.default_aggregation_period = period;
        self
    }

    /// With file-backed stores under `dir`
    #[inline]
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    /// With dry run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Per-request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Policy for augmentation and index calls
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.retry.policy(self.retry.max_attempts)
    }

    /// Policy for KPI submission
    #[must_use]
    pub fn kpi_policy(&self) -> RetryPolicy {
        self.retry.policy(self.retry.kpi_max_attempts)
    }
}
