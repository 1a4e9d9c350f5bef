use async_trait::async_trait;
use reqwest::Client;
use tracing::Instrument;

use crate::backoff::BackoffSchedule;
use crate::config::ProbeConfig;
use crate::telemetry;

use super::shutdown::ShutdownToken;

/// Single liveness request against a runner.
///
/// Returns the response status code, or an error when no response was
/// received at all.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, url: &str) -> anyhow::Result<u16>;
}

/// [`HealthCheck`] issuing an unauthenticated HTTP GET.
#[derive(Clone, Debug)]
pub struct HttpHealthCheck {
    client: Client,
}

impl HttpHealthCheck {
    /// Build a client bounded by the probe's request timeout.
    pub fn new(config: &ProbeConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.request_timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, url: &str) -> anyhow::Result<u16> {
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}

/// A probe attempt succeeds on any status below 300.
pub fn is_success(status: u16) -> bool {
    status < 300
}

/// Result of probing one runner service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProbeOutcome {
    Ready {
        attempts: usize,
    },
    /// The schedule ran out without a successful attempt.
    NotReady {
        attempts: usize,
        last_error: Option<String>,
    },
    /// The shutdown token fired before the probe finished.
    Cancelled {
        attempts: usize,
    },
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            ProbeOutcome::Ready { attempts }
            | ProbeOutcome::NotReady { attempts, .. }
            | ProbeOutcome::Cancelled { attempts } => *attempts,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Ready { .. } => "ready",
            ProbeOutcome::NotReady { .. } => "not_ready",
            ProbeOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

/// Probe `url` once per entry in `schedule`.
///
/// Returns on the first successful attempt without sleeping further. A
/// failed attempt is followed by that entry's delay. Both the request and
/// the delay give way to `token`.
pub async fn probe_service<H>(
    check: &H,
    service: &str,
    url: &str,
    schedule: &BackoffSchedule,
    token: &ShutdownToken,
) -> ProbeOutcome
where
    H: HealthCheck + ?Sized,
{
    let timer = telemetry::record_probe_start(service);
    let outcome = run_schedule(check, service, url, schedule, token)
        .instrument(telemetry::probe_span(service, url))
        .await;
    telemetry::record_probe_end(timer, outcome.as_str());
    outcome
}

async fn run_schedule<H>(
    check: &H,
    service: &str,
    url: &str,
    schedule: &BackoffSchedule,
    token: &ShutdownToken,
) -> ProbeOutcome
where
    H: HealthCheck + ?Sized,
{
    let mut last_error = None;

    for (index, delay) in schedule.delays().iter().enumerate() {
        let attempt = index + 1;

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return ProbeOutcome::Cancelled { attempts: index };
            }
            result = check.check(url) => result,
        };

        match result {
            Ok(status) if is_success(status) => {
                telemetry::record_probe_attempt(service, attempt, "success");
                return ProbeOutcome::Ready { attempts: attempt };
            }
            Ok(status) => {
                telemetry::record_probe_attempt(service, attempt, "status");
                last_error = Some(format!("unexpected status {status} from {url}"));
            }
            Err(e) => {
                telemetry::record_probe_attempt(service, attempt, "transport");
                last_error = Some(format!("{e:#}"));
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                return ProbeOutcome::Cancelled { attempts: attempt };
            }
            _ = tokio::time::sleep(*delay) => {}
        }
    }

    if let Some(error) = &last_error {
        tracing::error!(service, error = %error, "failed to get status from {}", service);
    }

    ProbeOutcome::NotReady {
        attempts: schedule.attempts(),
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Replays a fixed script of responses, repeating the last one.
    struct Scripted {
        responses: Mutex<VecDeque<Result<u16, String>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<u16, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl HealthCheck for Scripted {
        async fn check(&self, _url: &str) -> anyhow::Result<u16> {
            *self.calls.lock() += 1;
            let mut responses = self.responses.lock();
            let next = if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            };
            match next.unwrap_or(Err("no response scripted".into())) {
                Ok(status) => Ok(status),
                Err(e) => Err(anyhow::anyhow!(e)),
            }
        }
    }

    const URL: &str = "http://checkout-service-1.perf.svc.cluster.local:6565/v1/status";

    async fn probe(check: &Scripted, token: &ShutdownToken) -> ProbeOutcome {
        probe_service(
            check,
            "checkout-service-1",
            URL,
            &BackoffSchedule::default(),
            token,
        )
        .await
    }

    #[test]
    fn test_success_predicate() {
        assert!(is_success(200));
        assert!(is_success(204));
        assert!(is_success(299));
        assert!(!is_success(300));
        assert!(!is_success(404));
        assert!(!is_success(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_attempt_skips_sleeps() {
        let check = Scripted::new(vec![Ok(200)]);
        let started = Instant::now();

        let outcome = probe(&check, &ShutdownToken::new()).await;

        assert_eq!(outcome, ProbeOutcome::Ready { attempts: 1 });
        assert_eq!(check.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_second_attempt_waits_first_delay() {
        let check = Scripted::new(vec![Err("connection refused".into()), Ok(200)]);
        let started = Instant::now();

        let outcome = probe(&check, &ShutdownToken::new()).await;

        assert_eq!(outcome, ProbeOutcome::Ready { attempts: 2 });
        assert_eq!(check.calls(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_ready_after_exhausting_schedule_on_status() {
        let check = Scripted::new(vec![Ok(500)]);
        let started = Instant::now();

        let outcome = probe(&check, &ShutdownToken::new()).await;

        match outcome {
            ProbeOutcome::NotReady { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.unwrap().contains("500"));
            }
            other => panic!("expected NotReady, got {other:?}"),
        }
        assert_eq!(check.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_ready_after_transport_errors() {
        let check = Scripted::new(vec![Err("dns error".into())]);

        let outcome = probe(&check, &ShutdownToken::new()).await;

        assert!(!outcome.is_ready());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(check.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_backoff() {
        let check = Scripted::new(vec![Ok(503)]);
        let token = ShutdownToken::with_deadline(Instant::now() + Duration::from_secs(2));
        let started = Instant::now();

        let outcome = probe(&check, &token).await;

        assert!(matches!(outcome, ProbeOutcome::Cancelled { .. }));
        assert_eq!(check.calls(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let check = Scripted::new(vec![Ok(200)]);
        let token = ShutdownToken::new();
        token.cancel();

        let outcome = probe(&check, &token).await;

        assert_eq!(outcome, ProbeOutcome::Cancelled { attempts: 0 });
        assert_eq!(check.calls(), 0);
    }
}
