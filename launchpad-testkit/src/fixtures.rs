use launchpad::*;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A persisted load test in `created` stage with a fresh uid.
pub fn load_test(name: &str, namespace: &str, parallelism: u32) -> LoadTest {
    LoadTest::new(name, namespace, parallelism)
        .with_uid(Uuid::new_v4())
        .with_stage(Stage::Created)
}

/// Labels carried by every runner of `test` under the default config.
pub fn runner_labels(test: &LoadTest) -> BTreeMap<String, String> {
    let labels = RunnerLabels::default();
    BTreeMap::from([
        (labels.app_key, labels.app_value),
        (labels.instance_key, test.name.clone()),
        (labels.runner_key, labels.runner_value),
    ])
}

/// Runner pod `index` (1-based) of `test`.
pub fn runner_pod(test: &LoadTest, index: usize, phase: PodPhase) -> RunnerPod {
    RunnerPod {
        name: format!("{}-{}", test.name, index),
        namespace: test.namespace.clone(),
        labels: runner_labels(test),
        phase,
    }
}

/// Runner service `index` (1-based) of `test` with cluster IP `10.0.0.<index>`.
pub fn runner_service(test: &LoadTest, index: usize) -> RunnerService {
    RunnerService {
        name: format!("{}-service-{}", test.name, index),
        namespace: test.namespace.clone(),
        labels: runner_labels(test),
        cluster_ip: Some(format!("10.0.0.{index}")),
    }
}

/// Status URL of [`runner_service`] under the default probe config.
pub fn status_url(test: &LoadTest, index: usize) -> String {
    runner_service(test, index).status_url(&ProbeConfig::default())
}
