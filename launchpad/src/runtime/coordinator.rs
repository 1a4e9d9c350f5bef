use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::cluster::{RunnerLister, StarterJobCreator, StatusConflict, StatusWriter};
use crate::config::LauncherConfig;
use crate::error::{LaunchError, Result};
use crate::events::{EventMeta, EventPublisher, LaunchEvent, LaunchEventPayload};
use crate::load_test::{LoadTest, Stage};
use crate::starter::StarterJob;
use crate::telemetry;

use super::probe::{probe_service, HealthCheck, ProbeOutcome};
use super::readiness::check_all_ready;
use super::shutdown::ShutdownToken;

/// How a launch attempt ended without a hard error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LaunchOutcome {
    /// The load test is already past the pre-start stages.
    AlreadyStarted { stage: Stage },
    /// Not every runner pod is running yet.
    RunnersPending { running: usize, expected: usize },
    /// Every runner pod is running but the listed runner services do not
    /// match the pool yet.
    ServicesPending { listed: usize, expected: usize },
    /// A runner service did not answer its probe; later services were not
    /// probed.
    ServiceUnready { service: String, attempts: usize },
    /// The shutdown token fired before anything was written.
    Cancelled,
    /// The stage is now `started` and the starter job exists.
    Started {
        starter: String,
        hostnames: Vec<String>,
    },
}

impl LaunchOutcome {
    /// True when the outer loop should invoke the phase again later.
    pub fn should_requeue(&self) -> bool {
        matches!(
            self,
            LaunchOutcome::RunnersPending { .. }
                | LaunchOutcome::ServicesPending { .. }
                | LaunchOutcome::ServiceUnready { .. }
                | LaunchOutcome::Cancelled
        )
    }

    pub fn is_started(&self) -> bool {
        matches!(self, LaunchOutcome::Started { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchOutcome::AlreadyStarted { .. } => "already_started",
            LaunchOutcome::RunnersPending { .. } => "runners_pending",
            LaunchOutcome::ServicesPending { .. } => "services_pending",
            LaunchOutcome::ServiceUnready { .. } => "service_unready",
            LaunchOutcome::Cancelled => "cancelled",
            LaunchOutcome::Started { .. } => "started",
        }
    }
}

/// Starts a load test once every runner is running and healthy.
///
/// One call to [`LaunchCoordinator::start_runners`] is one pass of the
/// launch phase. Passes are independent: every pass lists pods and
/// services afresh, and the only state carried between passes is the
/// persisted stage.
pub struct LaunchCoordinator<L, S, C, H>
where
    L: RunnerLister + 'static,
    S: StatusWriter + 'static,
    C: StarterJobCreator + 'static,
    H: HealthCheck + 'static,
{
    config: LauncherConfig,
    lister: Arc<L>,
    status: Arc<S>,
    jobs: Arc<C>,
    health: Arc<H>,
    events: Arc<dyn EventPublisher + 'static>,
}

impl<L, S, C, H> fmt::Debug for LaunchCoordinator<L, S, C, H>
where
    L: RunnerLister + 'static,
    S: StatusWriter + 'static,
    C: StarterJobCreator + 'static,
    H: HealthCheck + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchCoordinator")
            .field("config", &self.config)
            .field("lister_type", &type_name::<L>())
            .field("status_type", &type_name::<S>())
            .field("jobs_type", &type_name::<C>())
            .field("health_type", &type_name::<H>())
            .finish()
    }
}

impl<L, S, C, H> LaunchCoordinator<L, S, C, H>
where
    L: RunnerLister + 'static,
    S: StatusWriter + 'static,
    C: StarterJobCreator + 'static,
    H: HealthCheck + 'static,
{
    pub fn new(
        config: LauncherConfig,
        lister: Arc<L>,
        status: Arc<S>,
        jobs: Arc<C>,
        health: Arc<H>,
        events: Arc<dyn EventPublisher + 'static>,
    ) -> Self {
        Self {
            config,
            lister,
            status,
            jobs,
            health,
            events,
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Run one pass of the launch phase for `test`.
    ///
    /// On success `test` is replaced with the persisted object. On any
    /// other path it is left untouched.
    pub async fn start_runners(
        &self,
        test: &mut LoadTest,
        token: &ShutdownToken,
    ) -> Result<LaunchOutcome> {
        let correlation_id = Uuid::now_v7();
        let span = telemetry::launch_span(test.key(), correlation_id.to_string());

        let result = self
            .run_pass(test, token, correlation_id)
            .instrument(span)
            .await;

        match &result {
            Ok(outcome) => telemetry::record_launch_outcome(test.key(), outcome.as_str()),
            Err(e) => telemetry::record_launch_outcome(test.key(), e.kind()),
        }
        result
    }

    async fn run_pass(
        &self,
        test: &mut LoadTest,
        token: &ShutdownToken,
        correlation_id: Uuid,
    ) -> Result<LaunchOutcome> {
        if !test.stage.is_pre_start() {
            tracing::debug!(stage = %test.stage, "load test already started, skipping");
            return Ok(LaunchOutcome::AlreadyStarted { stage: test.stage });
        }
        if test.parallelism == 0 {
            tracing::error!("load test has zero parallelism, refusing to start");
            return Err(LaunchError::InvalidParallelism {
                load_test: test.key(),
            });
        }
        if token.is_cancelled() {
            return Ok(LaunchOutcome::Cancelled);
        }

        tracing::info!("Waiting for pods to get ready");

        let readiness = check_all_ready(self.lister.as_ref(), test, &self.config.labels).await?;
        self.publish(
            test,
            correlation_id,
            LaunchEventPayload::RunnersCounted {
                running: readiness.running,
                expected: readiness.expected,
            },
        )
        .await;

        if !readiness.all_ready() {
            return Ok(LaunchOutcome::RunnersPending {
                running: readiness.running,
                expected: readiness.expected,
            });
        }

        let selector = self.config.labels.selector_for(test);
        let services = self
            .lister
            .list_services(&test.namespace, &selector)
            .await
            .map_err(|source| {
                tracing::error!(
                    selector = %selector,
                    error = %format!("{source:#}"),
                    "Could not list services"
                );
                LaunchError::ListServices {
                    load_test: test.key(),
                    selector: selector.to_string(),
                    source,
                }
            })?;

        if services.len() != readiness.expected {
            tracing::info!(
                listed = services.len(),
                expected = readiness.expected,
                "Waiting for runner services to be listed"
            );
            return Ok(LaunchOutcome::ServicesPending {
                listed: services.len(),
                expected: readiness.expected,
            });
        }

        let probe = &self.config.probe;
        let mut hostnames = Vec::with_capacity(services.len());

        for service in &services {
            hostnames.push(service.address(&probe.cluster_domain));

            let url = service.status_url(probe);
            let outcome = probe_service(
                self.health.as_ref(),
                &service.name,
                &url,
                &probe.backoff,
                token,
            )
            .await;

            match outcome {
                ProbeOutcome::Ready { attempts } => {
                    tracing::info!(service = %service.name, attempts, "{} service is ready", service.name);
                    self.publish(
                        test,
                        correlation_id,
                        LaunchEventPayload::ServiceReady {
                            service: service.name.clone(),
                            attempts,
                        },
                    )
                    .await;
                }
                ProbeOutcome::NotReady {
                    attempts,
                    last_error,
                } => {
                    tracing::info!(
                        service = %service.name,
                        attempts,
                        "{} service is not ready, aborting",
                        service.name
                    );
                    self.publish(
                        test,
                        correlation_id,
                        LaunchEventPayload::ServiceNotReady {
                            service: service.name.clone(),
                            attempts,
                            error: last_error,
                        },
                    )
                    .await;
                    return Ok(LaunchOutcome::ServiceUnready {
                        service: service.name.clone(),
                        attempts,
                    });
                }
                ProbeOutcome::Cancelled { .. } => {
                    tracing::info!(service = %service.name, "launch cancelled while probing");
                    return Ok(LaunchOutcome::Cancelled);
                }
            }
        }

        if token.is_cancelled() {
            return Ok(LaunchOutcome::Cancelled);
        }

        tracing::info!("Changing stage of load test status to started");
        let previous = test.stage;
        let mut updated = test.clone();
        updated.stage = Stage::Started;

        let persisted = self.status.update_status(&updated).await.map_err(|source| {
            tracing::error!(error = %format!("{source:#}"), "Could not update status of load test");
            match source.downcast::<StatusConflict>() {
                Ok(conflict) => LaunchError::StatusConflict(conflict),
                Err(source) => LaunchError::StatusUpdate {
                    load_test: test.key(),
                    source,
                },
            }
        })?;
        *test = persisted;

        self.publish(
            test,
            correlation_id,
            LaunchEventPayload::StageChanged {
                from: previous,
                to: test.stage,
            },
        )
        .await;

        let mut starter = StarterJob::new(test, hostnames, &self.config);

        if let Err(e) = starter.set_controller_reference(test) {
            tracing::error!(
                starter = %starter.name,
                error = %e,
                "Failed to set controller reference for the starter job"
            );
            self.publish(
                test,
                correlation_id,
                LaunchEventPayload::OwnerReferenceSkipped {
                    starter: starter.name.clone(),
                    reason: e.to_string(),
                },
            )
            .await;
        }

        self.jobs.create_starter(&starter).await.map_err(|source| {
            tracing::error!(
                starter = %starter.name,
                error = %format!("{source:#}"),
                "Failed to launch starter job"
            );
            LaunchError::CreateStarter {
                starter: starter.name.clone(),
                source,
            }
        })?;

        tracing::info!(starter = %starter.name, hosts = starter.hostnames.len(), "Created starter job");
        self.publish(
            test,
            correlation_id,
            LaunchEventPayload::StarterCreated {
                starter: starter.name.clone(),
                hostnames: starter.hostnames.clone(),
            },
        )
        .await;

        Ok(LaunchOutcome::Started {
            starter: starter.name,
            hostnames: starter.hostnames,
        })
    }

    async fn publish(&self, test: &LoadTest, correlation_id: Uuid, payload: LaunchEventPayload) {
        let event = LaunchEvent {
            meta: EventMeta::new(test.key(), Some(correlation_id)),
            payload,
        };
        if let Err(e) = self.events.publish(event).await {
            tracing::warn!(error = %e, "failed to publish launch event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_policy() {
        assert!(LaunchOutcome::RunnersPending {
            running: 1,
            expected: 2
        }
        .should_requeue());
        assert!(LaunchOutcome::ServicesPending {
            listed: 0,
            expected: 2
        }
        .should_requeue());
        assert!(LaunchOutcome::ServiceUnready {
            service: "checkout-service-2".into(),
            attempts: 3
        }
        .should_requeue());
        assert!(LaunchOutcome::Cancelled.should_requeue());
        assert!(!LaunchOutcome::AlreadyStarted {
            stage: Stage::Started
        }
        .should_requeue());

        let started = LaunchOutcome::Started {
            starter: "checkout-starter".into(),
            hostnames: vec![],
        };
        assert!(!started.should_requeue());
        assert!(started.is_started());
    }
}
