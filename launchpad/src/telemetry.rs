//! Tracing and telemetry instrumentation for the launch phase.
//!
//! Span constructors and record helpers. Every helper logs through
//! `tracing`; with the `metrics` feature enabled it also updates the
//! Prometheus metrics in [`crate::metrics`].

use tracing::{info_span, Span};

/// Span covering one launch attempt.
#[must_use]
pub fn launch_span(load_test: impl AsRef<str>, correlation_id: impl AsRef<str>) -> Span {
    info_span!(
        "launchpad.launch",
        load_test = %load_test.as_ref(),
        correlation_id = %correlation_id.as_ref(),
    )
}

/// Span covering the runner pod count.
#[must_use]
pub fn readiness_span(load_test: impl AsRef<str>, selector: impl AsRef<str>) -> Span {
    info_span!(
        "launchpad.readiness",
        load_test = %load_test.as_ref(),
        selector = %selector.as_ref(),
    )
}

/// Span covering every attempt against one runner service.
#[must_use]
pub fn probe_span(service: impl AsRef<str>, url: impl AsRef<str>) -> Span {
    info_span!(
        "launchpad.probe",
        service = %service.as_ref(),
        url = %url.as_ref(),
    )
}

/// Record the result of counting runner pods.
pub fn record_runners_counted(load_test: impl AsRef<str>, running: usize, expected: usize) {
    tracing::info!(
        load_test = %load_test.as_ref(),
        running,
        expected,
        "{}/{} runner pods ready",
        running,
        expected
    );

    #[cfg(feature = "metrics")]
    crate::metrics::set_runners_running(load_test.as_ref(), running as f64);
}

/// Record a single probe attempt.
///
/// `outcome` is one of `success`, `status`, `transport`.
pub fn record_probe_attempt(service: impl AsRef<str>, attempt: usize, outcome: impl AsRef<str>) {
    tracing::debug!(
        service = %service.as_ref(),
        attempt,
        outcome = %outcome.as_ref(),
        "probe attempt finished"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_probe_attempt(outcome.as_ref());
}

/// Record how a launch attempt ended.
pub fn record_launch_outcome(load_test: impl AsRef<str>, outcome: impl AsRef<str>) {
    tracing::info!(
        load_test = %load_test.as_ref(),
        outcome = %outcome.as_ref(),
        "launch attempt finished"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_launch_outcome(outcome.as_ref());
}

/// Start timing a probe of one service.
pub fn record_probe_start(service: impl AsRef<str>) -> ProbeTimingHandle {
    ProbeTimingHandle {
        service: service.as_ref().to_string(),
        start: std::time::Instant::now(),
    }
}

/// Finish timing a probe. `result` is `ready`, `not_ready` or `cancelled`.
pub fn record_probe_end(handle: ProbeTimingHandle, result: impl AsRef<str>) {
    let duration_secs = handle.start.elapsed().as_secs_f64();

    tracing::debug!(
        service = %handle.service,
        result = %result.as_ref(),
        duration_secs,
        "probe finished"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::observe_probe_duration(result.as_ref(), duration_secs);
}

/// Opaque handle returned by [`record_probe_start`].
#[derive(Debug)]
pub struct ProbeTimingHandle {
    service: String,
    start: std::time::Instant,
}

impl ProbeTimingHandle {
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
