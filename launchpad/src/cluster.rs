use async_trait::async_trait;
use thiserror::Error;

use crate::load_test::LoadTest;
use crate::resources::{LabelSelector, RunnerPod, RunnerService};
use crate::starter::StarterJob;

/// Read access to the runner pool.
///
/// Implementors query the cluster's directory service. Results must come
/// back in the directory's listing order; the launch phase preserves that
/// order all the way into the starter job.
#[async_trait]
pub trait RunnerLister: Send + Sync {
    /// List pods in `namespace` matching `selector`.
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> anyhow::Result<Vec<RunnerPod>>;

    /// List services in `namespace` matching `selector`.
    async fn list_services(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> anyhow::Result<Vec<RunnerService>>;
}

/// Write access to the load test's status subresource.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    /// Persist `test.stage`, returning the stored object.
    ///
    /// Implementors must reject the write with [`StatusConflict`] when
    /// `test.resource_version` is stale.
    async fn update_status(&self, test: &LoadTest) -> anyhow::Result<LoadTest>;
}

/// Creation of the starter job.
#[async_trait]
pub trait StarterJobCreator: Send + Sync {
    /// Submit the starter job. Returns once creation is acknowledged.
    async fn create_starter(&self, job: &StarterJob) -> anyhow::Result<()>;
}

/// Optimistic concurrency failure on a status write.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error(
    "status of {load_test} was modified concurrently \
     (expected version {expected}, found {actual})"
)]
pub struct StatusConflict {
    pub load_test: String,
    pub expected: u64,
    pub actual: u64,
}
