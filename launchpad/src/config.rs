use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backoff::BackoffSchedule;
use crate::load_test::LoadTest;
use crate::resources::LabelSelector;

/// Top-level configuration for the launch phase.
///
/// Every field has a default matching the k6 runner conventions, so an
/// empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Labels identifying runner pods and services.
    pub labels: RunnerLabels,
    /// Liveness probe settings.
    pub probe: ProbeConfig,
    /// Starter job settings.
    pub starter: StarterConfig,
}

impl LauncherConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_labels(mut self, labels: RunnerLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_starter(mut self, starter: StarterConfig) -> Self {
        self.starter = starter;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.port == 0 {
            return Err(ConfigError::Invalid("probe.port must be non-zero".into()));
        }
        if !self.probe.status_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "probe.status_path must start with '/', got {:?}",
                self.probe.status_path
            )));
        }
        // The probe client is built without a TLS backend.
        if self.probe.scheme != "http" {
            return Err(ConfigError::Invalid(format!(
                "probe.scheme must be http, got {:?}",
                self.probe.scheme
            )));
        }
        if self.probe.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "probe.request_timeout_ms must be non-zero".into(),
            ));
        }
        if self.labels.app_key.is_empty()
            || self.labels.instance_key.is_empty()
            || self.labels.runner_key.is_empty()
        {
            return Err(ConfigError::Invalid("label keys must be non-empty".into()));
        }
        if self.starter.image.is_empty() {
            return Err(ConfigError::Invalid("starter.image must be set".into()));
        }
        Ok(())
    }
}

/// Label keys and values shared by runner pods and their services.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerLabels {
    pub app_key: String,
    pub app_value: String,
    /// Key whose value is the owning load test's name.
    pub instance_key: String,
    pub runner_key: String,
    pub runner_value: String,
}

impl RunnerLabels {
    /// Selector matching every runner of `test`.
    pub fn selector_for(&self, test: &LoadTest) -> LabelSelector {
        LabelSelector::new()
            .with(&self.app_key, &self.app_value)
            .with(&self.instance_key, &test.name)
            .with(&self.runner_key, &self.runner_value)
    }
}

impl Default for RunnerLabels {
    fn default() -> Self {
        Self {
            app_key: "app".to_string(),
            app_value: "k6".to_string(),
            instance_key: "k6_cr".to_string(),
            runner_key: "runner".to_string(),
            runner_value: "true".to_string(),
        }
    }
}

/// How runner liveness is probed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Only `http` is accepted; runners serve their status API in plain text.
    pub scheme: String,
    /// DNS suffix appended to `<service>.<namespace>`.
    pub cluster_domain: String,
    pub port: u16,
    pub status_path: String,
    /// Timeout for a single GET, in milliseconds.
    pub request_timeout_ms: u64,
    /// Waits between attempts, in milliseconds.
    pub backoff: BackoffSchedule,
}

impl ProbeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn with_backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            cluster_domain: "svc.cluster.local".to_string(),
            port: 6565,
            status_path: "/v1/status".to_string(),
            request_timeout_ms: 2000,
            backoff: BackoffSchedule::default(),
        }
    }
}

/// Starter job settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StarterConfig {
    /// Container image providing `curl`.
    pub image: String,
    /// Appended to the load test name to form the job name.
    pub name_suffix: String,
}

impl Default for StarterConfig {
    fn default() -> Self {
        Self {
            image: "ghcr.io/grafana/k6-operator:latest-starter".to_string(),
            name_suffix: "-starter".to_string(),
        }
    }
}

/// Invalid launcher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
