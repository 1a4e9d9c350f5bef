//! Starter job descriptor.
//!
//! The starter is a one-shot job that un-pauses every runner once the
//! whole pool is healthy. Its command issues one `PATCH` per runner host,
//! in the order the hosts were listed.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::config::LauncherConfig;
use crate::load_test::LoadTest;

pub const LOAD_TEST_API_VERSION: &str = "k6.io/v1alpha1";
pub const LOAD_TEST_KIND: &str = "K6";

/// Lifecycle binding from the starter job to its parent load test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: Uuid,
    pub controller: bool,
    pub block_owner_deletion: bool,
}

/// Failure to bind the starter job to its parent.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum OwnerReferenceError {
    #[error("owner {owner} has no uid; it has not been persisted")]
    MissingUid { owner: String },

    #[error("owner {owner} is in namespace {owner_namespace}, job is in {job_namespace}")]
    CrossNamespace {
        owner: String,
        owner_namespace: String,
        job_namespace: String,
    },

    #[error("job is already controlled by {existing}")]
    AlreadyControlled { existing: String },
}

/// The control job that begins the distributed run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StarterJob {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    /// Runner addresses, in listing order.
    pub hostnames: Vec<String>,
    pub image: String,
    pub command: Vec<String>,
    pub owner: Option<OwnerReference>,
}

impl StarterJob {
    /// Build the starter job for `test` targeting `hostnames`.
    pub fn new(
        test: &LoadTest,
        hostnames: Vec<String>,
        config: &LauncherConfig,
    ) -> Self {
        let labels = BTreeMap::from([
            (config.labels.app_key.clone(), config.labels.app_value.clone()),
            (config.labels.instance_key.clone(), test.name.clone()),
        ]);
        let command = start_command(&hostnames, config);

        Self {
            name: format!("{}{}", test.name, config.starter.name_suffix),
            namespace: test.namespace.clone(),
            labels,
            hostnames,
            image: config.starter.image.clone(),
            command,
            owner: None,
        }
    }

    /// Make `owner` the controller of this job so it is garbage collected
    /// together with the load test.
    pub fn set_controller_reference(
        &mut self,
        owner: &LoadTest,
    ) -> Result<(), OwnerReferenceError> {
        let uid = owner.uid.ok_or_else(|| OwnerReferenceError::MissingUid {
            owner: owner.key(),
        })?;

        if owner.namespace != self.namespace {
            return Err(OwnerReferenceError::CrossNamespace {
                owner: owner.key(),
                owner_namespace: owner.namespace.clone(),
                job_namespace: self.namespace.clone(),
            });
        }

        if let Some(existing) = &self.owner {
            if existing.controller && existing.uid != uid {
                return Err(OwnerReferenceError::AlreadyControlled {
                    existing: format!("{}/{}", existing.kind, existing.name),
                });
            }
        }

        self.owner = Some(OwnerReference {
            api_version: LOAD_TEST_API_VERSION.to_string(),
            kind: LOAD_TEST_KIND.to_string(),
            name: owner.name.clone(),
            uid,
            controller: true,
            block_owner_deletion: true,
        });
        Ok(())
    }
}

fn start_command(hostnames: &[String], config: &LauncherConfig) -> Vec<String> {
    let body = json!({
        "data": {
            "attributes": { "paused": false },
            "id": "default",
            "type": "status"
        }
    });

    let requests: Vec<String> = hostnames
        .iter()
        .map(|host| {
            format!(
                "curl --retry 3 -X PATCH -H 'Content-Type: application/json' {}://{}:{}{} -d '{}'",
                config.probe.scheme,
                host,
                config.probe.port,
                config.probe.status_path,
                body
            )
        })
        .collect();

    vec!["sh".to_string(), "-c".to_string(), requests.join(" && ")]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]
    }

    #[test]
    fn test_starter_name_and_labels() {
        let test = LoadTest::new("checkout", "perf", 2);
        let job = StarterJob::new(&test, hosts(), &LauncherConfig::default());

        assert_eq!(job.name, "checkout-starter");
        assert_eq!(job.namespace, "perf");
        assert_eq!(job.labels.get("app").map(String::as_str), Some("k6"));
        assert_eq!(job.labels.get("k6_cr").map(String::as_str), Some("checkout"));
        assert_eq!(job.hostnames, hosts());
    }

    #[test]
    fn test_command_patches_hosts_in_order() {
        let test = LoadTest::new("checkout", "perf", 2);
        let job = StarterJob::new(&test, hosts(), &LauncherConfig::default());

        assert_eq!(job.command[0], "sh");
        let script = &job.command[2];
        let first = script.find("http://10.0.0.1:6565/v1/status").unwrap();
        let second = script.find("http://10.0.0.2:6565/v1/status").unwrap();
        assert!(first < second);
        assert!(script.contains(r#""paused":false"#));
        assert_eq!(script.matches("curl").count(), 2);
    }

    #[test]
    fn test_controller_reference_bound() {
        let uid = Uuid::new_v4();
        let test = LoadTest::new("checkout", "perf", 2).with_uid(uid);
        let mut job = StarterJob::new(&test, hosts(), &LauncherConfig::default());

        job.set_controller_reference(&test).unwrap();
        let owner = job.owner.unwrap();
        assert_eq!(owner.uid, uid);
        assert_eq!(owner.kind, LOAD_TEST_KIND);
        assert!(owner.controller);
    }

    #[test]
    fn test_controller_reference_requires_uid() {
        let test = LoadTest::new("checkout", "perf", 2);
        let mut job = StarterJob::new(&test, hosts(), &LauncherConfig::default());

        let err = job.set_controller_reference(&test).unwrap_err();
        assert!(matches!(err, OwnerReferenceError::MissingUid { .. }));
        assert!(job.owner.is_none());
    }

    #[test]
    fn test_controller_reference_rejects_second_controller() {
        let first = LoadTest::new("checkout", "perf", 2).with_uid(Uuid::new_v4());
        let second = LoadTest::new("checkout", "perf", 2).with_uid(Uuid::new_v4());
        let mut job = StarterJob::new(&first, hosts(), &LauncherConfig::default());

        job.set_controller_reference(&first).unwrap();
        let err = job.set_controller_reference(&second).unwrap_err();
        assert!(matches!(err, OwnerReferenceError::AlreadyControlled { .. }));
    }
}
