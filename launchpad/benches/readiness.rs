//! Benchmarks for the launch phase using criterion.
//!
//! - Counting running pods over large listings
//! - A full launch pass against the in-memory cluster

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use launchpad::*;
use launchpad_testkit::{load_test, runner_pod, runner_service, InMemoryCluster, ScriptedHealthCheck};
use tokio::runtime::Runtime;

fn create_runtime() -> Runtime {
    Runtime::new().expect("Failed to create tokio runtime")
}

fn bench_count_running(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_running");
    let test = load_test("bench", "perf", 1);

    for size in [10usize, 100, 1_000] {
        let pods: Vec<RunnerPod> = (1..=size)
            .map(|i| {
                let phase = if i % 10 == 0 {
                    PodPhase::Pending
                } else {
                    PodPhase::Running
                };
                runner_pod(&test, i, phase)
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &pods, |b, pods| {
            b.iter(|| count_running(std::hint::black_box(pods)))
        });
    }

    group.finish();
}

fn bench_launch_pass(c: &mut Criterion) {
    let rt = create_runtime();
    let mut group = c.benchmark_group("launch_pass");
    group.sample_size(50);

    for parallelism in [1u32, 16, 64] {
        group.bench_with_input(
            BenchmarkId::from_parameter(parallelism),
            &parallelism,
            |b, &parallelism| {
                b.to_async(&rt).iter(|| async move {
                    let cluster = Arc::new(InMemoryCluster::new());
                    let mut test = cluster.insert_load_test(load_test("bench", "perf", parallelism));
                    for i in 1..=parallelism as usize {
                        cluster.add_pod(runner_pod(&test, i, PodPhase::Running));
                        cluster.add_service(runner_service(&test, i));
                    }

                    let coordinator = LaunchCoordinatorBuilder::new(LauncherConfig::default())
                        .with_lister(Arc::clone(&cluster))
                        .with_status_writer(Arc::clone(&cluster))
                        .with_job_creator(Arc::clone(&cluster))
                        .with_health_check(Arc::new(ScriptedHealthCheck::healthy()))
                        .build()
                        .expect("coordinator should build");

                    let outcome = coordinator
                        .start_runners(&mut test, &ShutdownToken::new())
                        .await
                        .expect("launch pass should succeed");
                    assert!(outcome.is_started());
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_count_running, bench_launch_pass);
criterion_main!(benches);
