use async_trait::async_trait;
use launchpad::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory stand-in for the cluster API.
///
/// Implements every cluster seam of the launch phase. Pods and services
/// are listed in insertion order. Each operation can be made to fail.
#[derive(Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

#[derive(Default)]
struct ClusterState {
    load_tests: HashMap<String, LoadTest>,
    pods: Vec<RunnerPod>,
    services: Vec<RunnerService>,
    starters: Vec<StarterJob>,
    failures: Failures,
    calls: CallCounts,
}

#[derive(Default)]
struct Failures {
    list_pods: Option<String>,
    list_services: Option<String>,
    update_status: Option<String>,
    create_starter: Option<String>,
}

/// Number of calls made to each seam.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CallCounts {
    pub list_pods: usize,
    pub list_services: usize,
    pub update_status: usize,
    pub create_starter: usize,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `test` as persisted and return the stored copy.
    pub fn insert_load_test(&self, test: LoadTest) -> LoadTest {
        let mut state = self.state.lock();
        let mut stored = test;
        stored.resource_version = stored.resource_version.max(1);
        state.load_tests.insert(stored.key(), stored.clone());
        stored
    }

    pub fn load_test(&self, key: &str) -> Option<LoadTest> {
        self.state.lock().load_tests.get(key).cloned()
    }

    /// Simulate another writer touching the stored load test.
    pub fn bump_resource_version(&self, key: &str) {
        if let Some(test) = self.state.lock().load_tests.get_mut(key) {
            test.resource_version += 1;
        }
    }

    pub fn add_pod(&self, pod: RunnerPod) {
        self.state.lock().pods.push(pod);
    }

    pub fn add_service(&self, service: RunnerService) {
        self.state.lock().services.push(service);
    }

    /// Change the phase of every pod named `name`.
    pub fn set_pod_phase(&self, name: &str, phase: PodPhase) {
        for pod in self.state.lock().pods.iter_mut().filter(|p| p.name == name) {
            pod.phase = phase;
        }
    }

    pub fn starters(&self) -> Vec<StarterJob> {
        self.state.lock().starters.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    pub fn fail_list_pods(&self, error: impl Into<String>) {
        self.state.lock().failures.list_pods = Some(error.into());
    }

    pub fn fail_list_services(&self, error: impl Into<String>) {
        self.state.lock().failures.list_services = Some(error.into());
    }

    pub fn fail_update_status(&self, error: impl Into<String>) {
        self.state.lock().failures.update_status = Some(error.into());
    }

    pub fn fail_create_starter(&self, error: impl Into<String>) {
        self.state.lock().failures.create_starter = Some(error.into());
    }

    /// Remove every injected failure.
    pub fn heal(&self) {
        self.state.lock().failures = Failures::default();
    }
}

#[async_trait]
impl RunnerLister for InMemoryCluster {
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> anyhow::Result<Vec<RunnerPod>> {
        let mut state = self.state.lock();
        state.calls.list_pods += 1;
        if let Some(error) = &state.failures.list_pods {
            anyhow::bail!("{error}");
        }

        Ok(state
            .pods
            .iter()
            .filter(|pod| pod.namespace == namespace && selector.matches(&pod.labels))
            .cloned()
            .collect())
    }

    async fn list_services(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> anyhow::Result<Vec<RunnerService>> {
        let mut state = self.state.lock();
        state.calls.list_services += 1;
        if let Some(error) = &state.failures.list_services {
            anyhow::bail!("{error}");
        }

        Ok(state
            .services
            .iter()
            .filter(|svc| svc.namespace == namespace && selector.matches(&svc.labels))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StatusWriter for InMemoryCluster {
    async fn update_status(&self, test: &LoadTest) -> anyhow::Result<LoadTest> {
        let mut state = self.state.lock();
        state.calls.update_status += 1;
        if let Some(error) = &state.failures.update_status {
            anyhow::bail!("{error}");
        }

        let key = test.key();
        let Some(stored) = state.load_tests.get_mut(&key) else {
            anyhow::bail!("load test {key} not found");
        };

        if stored.resource_version != test.resource_version {
            return Err(StatusConflict {
                load_test: key,
                expected: test.resource_version,
                actual: stored.resource_version,
            }
            .into());
        }

        stored.stage = test.stage;
        stored.resource_version += 1;
        Ok(stored.clone())
    }
}

#[async_trait]
impl StarterJobCreator for InMemoryCluster {
    async fn create_starter(&self, job: &StarterJob) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.calls.create_starter += 1;
        if let Some(error) = &state.failures.create_starter {
            anyhow::bail!("{error}");
        }

        if state
            .starters
            .iter()
            .any(|s| s.name == job.name && s.namespace == job.namespace)
        {
            anyhow::bail!("jobs.batch \"{}\" already exists", job.name);
        }

        state.starters.push(job.clone());
        Ok(())
    }
}
