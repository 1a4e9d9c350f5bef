use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::config::ProbeConfig;

/// Equality-based label selector.
///
/// Every key must be present on the candidate with exactly the same value.
/// An empty selector matches everything.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `key=value` requirement.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

impl Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Lifecycle phase reported for a runner pod.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

/// One member of the runner pool, as observed through the lister.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunnerPod {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub phase: PodPhase,
}

impl RunnerPod {
    pub fn is_running(&self) -> bool {
        self.phase == PodPhase::Running
    }
}

/// Cluster IP value reported by headless services.
const HEADLESS_CLUSTER_IP: &str = "None";

/// Network endpoint in front of one runner pod.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunnerService {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub cluster_ip: Option<String>,
}

impl RunnerService {
    /// In-cluster DNS name, e.g. `runner-1.perf.svc.cluster.local`.
    pub fn dns_name(&self, cluster_domain: &str) -> String {
        format!("{}.{}.{}", self.name, self.namespace, cluster_domain)
    }

    /// Address handed to the starter job.
    ///
    /// The cluster IP when one is assigned, otherwise the DNS name.
    pub fn address(&self, cluster_domain: &str) -> String {
        match self.cluster_ip.as_deref() {
            Some(ip) if !ip.is_empty() && ip != HEADLESS_CLUSTER_IP => {
                ip.to_string()
            }
            _ => self.dns_name(cluster_domain),
        }
    }

    /// Liveness URL probed before the run is started.
    pub fn status_url(&self, config: &ProbeConfig) -> String {
        format!(
            "{}://{}:{}{}",
            config.scheme,
            self.dns_name(&config.cluster_domain),
            config.port,
            config.status_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn service(cluster_ip: Option<&str>) -> RunnerService {
        RunnerService {
            name: "checkout-service-1".to_string(),
            namespace: "perf".to_string(),
            labels: BTreeMap::new(),
            cluster_ip: cluster_ip.map(str::to_string),
        }
    }

    #[test]
    fn test_selector_matches_subset() {
        let selector = LabelSelector::new()
            .with("app", "k6")
            .with("k6_cr", "checkout");

        assert!(selector.matches(&labels(&[
            ("app", "k6"),
            ("k6_cr", "checkout"),
            ("runner", "true"),
        ])));
        assert!(!selector.matches(&labels(&[("app", "k6")])));
        assert!(!selector.matches(&labels(&[
            ("app", "k6"),
            ("k6_cr", "other"),
        ])));
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        assert!(LabelSelector::new().matches(&BTreeMap::new()));
    }

    #[test]
    fn test_selector_display_is_sorted() {
        let selector = LabelSelector::new()
            .with("runner", "true")
            .with("app", "k6")
            .with("k6_cr", "checkout");
        assert_eq!(selector.to_string(), "app=k6,k6_cr=checkout,runner=true");
    }

    #[test]
    fn test_status_url_uses_dns_name() {
        let url = service(Some("10.0.0.7")).status_url(&ProbeConfig::default());
        assert_eq!(
            url,
            "http://checkout-service-1.perf.svc.cluster.local:6565/v1/status"
        );
    }

    #[test]
    fn test_address_prefers_cluster_ip() {
        let domain = "svc.cluster.local";
        assert_eq!(service(Some("10.0.0.7")).address(domain), "10.0.0.7");
        assert_eq!(
            service(Some("None")).address(domain),
            "checkout-service-1.perf.svc.cluster.local"
        );
        assert_eq!(
            service(None).address(domain),
            "checkout-service-1.perf.svc.cluster.local"
        );
    }
}
