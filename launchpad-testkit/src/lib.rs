//! Test support for launchpad: an in-memory cluster, a scripted health
//! check and fixtures for runner pods and services.

mod cluster;
mod fixtures;
mod probe;

pub use cluster::{CallCounts, InMemoryCluster};
pub use fixtures::{load_test, runner_labels, runner_pod, runner_service, status_url};
pub use probe::{ProbeReply, ScriptedHealthCheck};
