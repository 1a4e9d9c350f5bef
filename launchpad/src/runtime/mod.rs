/// Builder for constructing coordinator instances.
pub mod builder;
/// The launch phase itself.
pub mod coordinator;
/// Runner liveness probing with backoff.
pub mod probe;
/// Runner pod readiness counting.
pub mod readiness;
/// Cancellation and deadline signalling.
pub mod shutdown;

pub use builder::LaunchCoordinatorBuilder;
pub use coordinator::{LaunchCoordinator, LaunchOutcome};
pub use probe::{is_success, probe_service, HealthCheck, HttpHealthCheck, ProbeOutcome};
pub use readiness::{check_all_ready, count_running, RunnerReadiness};
pub use shutdown::ShutdownToken;
