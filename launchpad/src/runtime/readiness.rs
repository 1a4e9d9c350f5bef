use tracing::Instrument;

use crate::cluster::RunnerLister;
use crate::config::RunnerLabels;
use crate::error::LaunchError;
use crate::load_test::LoadTest;
use crate::resources::RunnerPod;
use crate::telemetry;

/// Snapshot of how many runner pods are up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunnerReadiness {
    pub running: usize,
    pub expected: usize,
}

impl RunnerReadiness {
    /// Exactly `expected` pods are running. More than expected is an
    /// inconsistent or still-scaling pool and does not count as ready. An
    /// empty pool is never ready.
    pub fn all_ready(&self) -> bool {
        self.expected > 0 && self.running == self.expected
    }
}

/// Number of pods in the `Running` phase.
pub fn count_running(pods: &[RunnerPod]) -> usize {
    pods.iter().filter(|pod| pod.is_running()).count()
}

/// Count the running runner pods of `test` and compare with its
/// parallelism. Listing failures are returned, not retried.
pub async fn check_all_ready<L>(
    lister: &L,
    test: &LoadTest,
    labels: &RunnerLabels,
) -> Result<RunnerReadiness, LaunchError>
where
    L: RunnerLister + ?Sized,
{
    let selector = labels.selector_for(test);
    let span = telemetry::readiness_span(test.key(), selector.to_string());

    async {
        let pods = lister
            .list_pods(&test.namespace, &selector)
            .await
            .map_err(|source| {
                tracing::error!(
                    load_test = %test,
                    selector = %selector,
                    error = %format!("{source:#}"),
                    "Could not list pods"
                );
                LaunchError::ListRunners {
                    load_test: test.key(),
                    selector: selector.to_string(),
                    source,
                }
            })?;

        let readiness = RunnerReadiness {
            running: count_running(&pods),
            expected: test.parallelism as usize,
        };
        telemetry::record_runners_counted(test.key(), readiness.running, readiness.expected);

        Ok::<_, LaunchError>(readiness)
    }
    .instrument(span)
    .await
}
