use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::cluster::{RunnerLister, StarterJobCreator, StatusWriter};
use crate::config::LauncherConfig;
use crate::events::{EventPublisher, InProcEventBus};

use super::coordinator::LaunchCoordinator;
use super::probe::{HealthCheck, HttpHealthCheck};

/// Builder for a [`LaunchCoordinator`] with explicit dependencies.
///
/// The lister, status writer and job creator are required. The health
/// check defaults to [`HttpHealthCheck`] when built through
/// [`LaunchCoordinatorBuilder::build_http`]; events default to an
/// in-process bus nobody listens to.
///
/// # Example
///
/// ```ignore
/// use launchpad::*;
///
/// let coordinator = LaunchCoordinatorBuilder::new(config)
///     .with_lister(cluster.clone())
///     .with_status_writer(cluster.clone())
///     .with_job_creator(cluster)
///     .build_http()?;
/// ```
pub struct LaunchCoordinatorBuilder<L, S, C, H>
where
    L: RunnerLister + 'static,
    S: StatusWriter + 'static,
    C: StarterJobCreator + 'static,
    H: HealthCheck + 'static,
{
    config: LauncherConfig,
    lister: Option<Arc<L>>,
    status: Option<Arc<S>>,
    jobs: Option<Arc<C>>,
    health: Option<Arc<H>>,
    events: Option<Arc<dyn EventPublisher + 'static>>,
}

impl<L, S, C, H> fmt::Debug for LaunchCoordinatorBuilder<L, S, C, H>
where
    L: RunnerLister + 'static,
    S: StatusWriter + 'static,
    C: StarterJobCreator + 'static,
    H: HealthCheck + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("LaunchCoordinatorBuilder");
        debug.field("config", &self.config);
        debug.field("lister_set", &self.lister.is_some());
        debug.field("status_set", &self.status.is_some());
        debug.field("jobs_set", &self.jobs.is_some());
        debug.field("health_set", &self.health.is_some());
        debug.field("events_set", &self.events.is_some());

        if self.health.is_some() {
            debug.field("health_type", &type_name::<H>());
        }

        debug.finish()
    }
}

impl<L, S, C, H> LaunchCoordinatorBuilder<L, S, C, H>
where
    L: RunnerLister + 'static,
    S: StatusWriter + 'static,
    C: StarterJobCreator + 'static,
    H: HealthCheck + 'static,
{
    pub fn new(config: LauncherConfig) -> Self {
        Self {
            config,
            lister: None,
            status: None,
            jobs: None,
            health: None,
            events: None,
        }
    }

    /// Set the runner pod and service lister.
    pub fn with_lister(mut self, lister: Arc<L>) -> Self {
        self.lister = Some(lister);
        self
    }

    /// Set the status subresource writer.
    pub fn with_status_writer(mut self, status: Arc<S>) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the starter job creator.
    pub fn with_job_creator(mut self, jobs: Arc<C>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Set the health check used to probe runner services.
    pub fn with_health_check(mut self, health: Arc<H>) -> Self {
        self.health = Some(health);
        self
    }

    /// Set the event publisher.
    pub fn with_events(mut self, events: Arc<dyn EventPublisher + 'static>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the coordinator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a required
    /// dependency is missing.
    pub fn build(self) -> anyhow::Result<LaunchCoordinator<L, S, C, H>> {
        let health = self
            .health
            .clone()
            .ok_or_else(|| anyhow::anyhow!("health check dependency missing"))?;
        self.assemble(health)
    }

    fn assemble(self, health: Arc<H>) -> anyhow::Result<LaunchCoordinator<L, S, C, H>> {
        self.config.validate()?;

        let lister = self
            .lister
            .ok_or_else(|| anyhow::anyhow!("lister dependency missing"))?;
        let status = self
            .status
            .ok_or_else(|| anyhow::anyhow!("status writer dependency missing"))?;
        let jobs = self
            .jobs
            .ok_or_else(|| anyhow::anyhow!("job creator dependency missing"))?;
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(InProcEventBus::default()));

        Ok(LaunchCoordinator::new(
            self.config,
            lister,
            status,
            jobs,
            health,
            events,
        ))
    }
}

impl<L, S, C> LaunchCoordinatorBuilder<L, S, C, HttpHealthCheck>
where
    L: RunnerLister + 'static,
    S: StatusWriter + 'static,
    C: StarterJobCreator + 'static,
{
    /// Build the coordinator probing runners over HTTP, creating an
    /// [`HttpHealthCheck`] from the probe configuration unless one was set.
    pub fn build_http(self) -> anyhow::Result<LaunchCoordinator<L, S, C, HttpHealthCheck>> {
        let health = match self.health.clone() {
            Some(health) => health,
            None => Arc::new(HttpHealthCheck::new(&self.config.probe)?),
        };
        self.assemble(health)
    }
}
