use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::load_test::Stage;

/// Metadata envelope attached to every launch event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventMeta {
    pub version: u16,
    /// Shared by every event of one launch attempt.
    pub correlation_id: Uuid,
    /// `namespace/name` of the load test.
    pub load_test: String,
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    pub fn new(load_test: impl Into<String>, correlation_id: Option<Uuid>) -> Self {
        Self {
            version: 1,
            correlation_id: correlation_id.unwrap_or_else(Uuid::now_v7),
            load_test: load_test.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Event emitted while starting a load test.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaunchEvent {
    pub meta: EventMeta,
    pub payload: LaunchEventPayload,
}

/// What happened during a launch attempt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum LaunchEventPayload {
    /// Runner pods were counted.
    RunnersCounted { running: usize, expected: usize },
    /// A runner service answered its liveness probe.
    ServiceReady { service: String, attempts: usize },
    /// A runner service did not answer within the backoff schedule.
    ServiceNotReady {
        service: String,
        attempts: usize,
        error: Option<String>,
    },
    /// The load test stage was persisted.
    StageChanged { from: Stage, to: Stage },
    /// The starter job could not be bound to its parent.
    OwnerReferenceSkipped { starter: String, reason: String },
    /// The starter job was created.
    StarterCreated {
        starter: String,
        hostnames: Vec<String>,
    },
}

/// Publisher of launch events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to all subscribers.
    ///
    /// Returns an error if the event cannot be published.
    async fn publish(&self, event: LaunchEvent) -> anyhow::Result<()>;
}

/// Subscription side of an event bus.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to events, returning a broadcast receiver.
    ///
    /// Multiple subscribers can receive the same events (fan-out).
    fn subscribe(&self) -> broadcast::Receiver<LaunchEvent>;
}

/// In-process event bus using a tokio broadcast channel.
///
/// Publishing never waits for slow subscribers. A subscriber that falls
/// more than `capacity` events behind receives `RecvError::Lagged`. With
/// no subscribers, events are dropped.
pub struct InProcEventBus {
    sender: broadcast::Sender<LaunchEvent>,
    capacity: usize,
}

impl std::fmt::Debug for InProcEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcEventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl InProcEventBus {
    /// Create a bus buffering at most `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }
}

impl Default for InProcEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for InProcEventBus {
    async fn publish(&self, event: LaunchEvent) -> anyhow::Result<()> {
        let _ = self.sender.send(event);
        Ok(())
    }
}

impl EventSubscriber for InProcEventBus {
    fn subscribe(&self) -> broadcast::Receiver<LaunchEvent> {
        self.sender.subscribe()
    }
}
