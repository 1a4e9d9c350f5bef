use async_trait::async_trait;
use launchpad::*;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Scripted reply to one probe attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProbeReply {
    Status(u16),
    TransportError(String),
}

/// [`HealthCheck`] replaying scripted replies per URL.
///
/// Each URL consumes its script front to back and then keeps repeating
/// the last reply. URLs without a script get the default reply.
#[derive(Clone)]
pub struct ScriptedHealthCheck {
    scripts: Arc<Mutex<HashMap<String, VecDeque<ProbeReply>>>>,
    default_reply: Arc<Mutex<ProbeReply>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedHealthCheck {
    /// Every URL answers 200 unless scripted otherwise.
    pub fn healthy() -> Self {
        Self::with_default(ProbeReply::Status(200))
    }

    pub fn with_default(reply: ProbeReply) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            default_reply: Arc::new(Mutex::new(reply)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the replies for `url`.
    pub fn script(&self, url: impl Into<String>, replies: Vec<ProbeReply>) {
        self.scripts.lock().insert(url.into(), replies.into());
    }

    /// URLs probed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == url).count()
    }

    pub fn assert_call_count_eq(&self, expected: usize) {
        let actual = self.calls.lock().len();
        assert_eq!(
            actual, expected,
            "Expected {} probe attempts, got {}",
            expected, actual
        );
    }

    fn next_reply(&self, url: &str) -> ProbeReply {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(url) {
            Some(script) if script.len() > 1 => script
                .pop_front()
                .unwrap_or_else(|| self.default_reply.lock().clone()),
            Some(script) => script
                .front()
                .cloned()
                .unwrap_or_else(|| self.default_reply.lock().clone()),
            None => self.default_reply.lock().clone(),
        }
    }
}

impl Default for ScriptedHealthCheck {
    fn default() -> Self {
        Self::healthy()
    }
}

#[async_trait]
impl HealthCheck for ScriptedHealthCheck {
    async fn check(&self, url: &str) -> anyhow::Result<u16> {
        self.calls.lock().push(url.to_string());
        match self.next_reply(url) {
            ProbeReply::Status(status) => Ok(status),
            ProbeReply::TransportError(error) => anyhow::bail!("{error}"),
        }
    }
}
