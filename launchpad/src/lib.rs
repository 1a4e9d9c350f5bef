//! Launchpad - starts a distributed k6 load test once its runners are healthy.
//!
//! A load test runs as a fixed-size pool of runner pods, each paused behind
//! its own service. Launchpad implements the reconcile phase that waits for
//! the whole pool, probes every runner, and then flips the load test to
//! `started` and creates the starter job that un-pauses the runners.
//!
//! # Core Concepts
//!
//! - **Load test**: the [`LoadTest`] resource with its expected
//!   parallelism and its [`Stage`].
//!
//! - **Cluster seams**: [`RunnerLister`], [`StatusWriter`] and
//!   [`StarterJobCreator`] abstract the cluster API so the phase can run
//!   against an in-memory fake.
//!
//! - **Readiness**: [`check_all_ready`] counts running runner pods and
//!   requires an exact match with the parallelism.
//!
//! - **Probing**: [`probe_service`] retries a [`HealthCheck`] along an
//!   immutable [`BackoffSchedule`], giving way to a [`ShutdownToken`].
//!
//! - **Coordinator**: [`LaunchCoordinator`] runs one pass of the phase and
//!   reports a [`LaunchOutcome`] or a [`LaunchError`].
//!
//! - **Events**: [`LaunchEvent`]s go to an [`EventPublisher`], by default an
//!   [`InProcEventBus`].
//!
//! # Feature Flags
//!
//! - `metrics` - Prometheus metrics support
//!
//! # Example
//!
//! ```ignore
//! use launchpad::*;
//!
//! let coordinator = LaunchCoordinatorBuilder::new(LauncherConfig::default())
//!     .with_lister(cluster.clone())
//!     .with_status_writer(cluster.clone())
//!     .with_job_creator(cluster)
//!     .build_http()?;
//!
//! let outcome = coordinator.start_runners(&mut load_test, &ShutdownToken::new()).await?;
//! if outcome.should_requeue() {
//!     // come back later
//! }
//! ```

/// Probe retry schedule.
pub mod backoff;

/// Cluster access traits.
///
/// [`RunnerLister`], [`StatusWriter`] and [`StarterJobCreator`] are the
/// only ways the launch phase touches the cluster.
pub mod cluster;

/// Configuration for labels, probing and the starter job.
pub mod config;

/// Hard failures of the launch phase.
pub mod error;

/// Launch lifecycle events and the in-process event bus.
pub mod events;


/// Runner pods, runner services and label selectors.
pub mod resources;

/// The launch phase: readiness, probing, coordination.
pub mod runtime;

/// Starter job descriptor.
pub mod starter;

/// Tracing spans and record helpers.
pub mod telemetry;

#[cfg(feature = "metrics")]
/// Prometheus metrics, behind the `metrics` feature.
pub mod metrics;

pub use backoff::*;
pub use cluster::*;
pub use config::*;
pub use error::LaunchError;
pub use events::*;
pub use load_test::*;
pub use resources::*;
pub use runtime::*;
pub use starter::*;
