//! Prometheus metrics for the launch phase.
//!
//! Compiled only with the `metrics` feature.
//!
//! # Metrics
//!
//! ## Counters
//! - `launchpad_probe_attempts_total` - Probe attempts by outcome
//! - `launchpad_launch_outcomes_total` - Launch attempts by outcome
//!
//! ## Gauges
//! - `launchpad_runners_running` - Running runner pods per load test
//!
//! ## Histograms
//! - `launchpad_probe_duration_seconds` - Time spent probing one service
#![cfg(feature = "metrics")]

use prometheus::{
    exponential_buckets, CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
};
use std::sync::LazyLock;

/// Global Prometheus registry for launchpad metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Labels:
/// - `outcome`: success, status, transport
pub static PROBE_ATTEMPTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "launchpad_probe_attempts_total",
        "Total number of runner probe attempts",
    );
    CounterVec::new(opts, &["outcome"])
        .expect("launchpad_probe_attempts_total metric creation failed")
});

/// Labels:
/// - `outcome`: started, runners_pending, service_unready, cancelled,
///   already_started, or an error kind
pub static LAUNCH_OUTCOMES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "launchpad_launch_outcomes_total",
        "Total number of launch attempts by outcome",
    );
    CounterVec::new(opts, &["outcome"])
        .expect("launchpad_launch_outcomes_total metric creation failed")
});

/// Labels:
/// - `load_test`: `namespace/name`
pub static RUNNERS_RUNNING: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        "launchpad_runners_running",
        "Runner pods observed in the Running phase",
    );
    GaugeVec::new(opts, &["load_test"])
        .expect("launchpad_runners_running metric creation failed")
});

/// Labels:
/// - `result`: ready, not_ready, cancelled
pub static PROBE_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let buckets = exponential_buckets(0.005, 2.0, 14).expect("bucket creation failed");
    let opts = HistogramOpts::new(
        "launchpad_probe_duration_seconds",
        "Time spent probing one runner service",
    )
    .buckets(buckets);
    HistogramVec::new(opts, &["result"])
        .expect("launchpad_probe_duration_seconds metric creation failed")
});

/// Register all metrics with [`REGISTRY`]. Safe to call more than once.
pub fn init_metrics() -> anyhow::Result<()> {
    let registry = &*REGISTRY;

    for metric in [
        Box::new(PROBE_ATTEMPTS_TOTAL.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(LAUNCH_OUTCOMES_TOTAL.clone()),
        Box::new(RUNNERS_RUNNING.clone()),
        Box::new(PROBE_DURATION_SECONDS.clone()),
    ] {
        if let Err(e) = registry.register(metric) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                return Err(e.into());
            }
        }
    }

    Ok(())
}

pub fn record_probe_attempt(outcome: &str) {
    PROBE_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_launch_outcome(outcome: &str) {
    LAUNCH_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn set_runners_running(load_test: &str, running: f64) {
    RUNNERS_RUNNING.with_label_values(&[load_test]).set(running);
}

pub fn observe_probe_duration(result: &str, duration_secs: f64) {
    PROBE_DURATION_SECONDS
        .with_label_values(&[result])
        .observe(duration_secs);
}

/// Gather all registered metrics in Prometheus text format.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization_is_idempotent() {
        init_metrics().expect("metrics initialization should succeed");
        init_metrics().expect("second initialization should succeed");
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics().expect("metrics initialization should succeed");

        record_probe_attempt("success");
        record_launch_outcome("started");
        set_runners_running("perf/checkout", 2.0);
        observe_probe_duration("ready", 0.01);

        let output = gather_metrics().expect("gather should succeed");
        assert!(output.contains("launchpad_probe_attempts_total"));
        assert!(output.contains("launchpad_launch_outcomes_total"));
        assert!(output.contains("launchpad_runners_running"));
        assert!(output.contains("launchpad_probe_duration_seconds"));
    }
}
