use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed, ordered list of waits used when probing a runner.
///
/// One attempt is made per entry. After a failed attempt the probe waits
/// the entry's delay before the next attempt (or before giving up, for the
/// last entry). Immutable once built.
///
/// Serialized as a list of milliseconds.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

/// Rejected backoff schedule.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum BackoffError {
    #[error("backoff schedule must contain at least one delay")]
    Empty,
}

impl BackoffSchedule {
    /// Build a schedule from explicit delays.
    pub fn new(delays: Vec<Duration>) -> Result<Self, BackoffError> {
        if delays.is_empty() {
            return Err(BackoffError::Empty);
        }
        Ok(Self { delays })
    }

    /// Build a schedule from millisecond delays.
    pub fn from_millis(
        delays: impl IntoIterator<Item = u64>,
    ) -> Result<Self, BackoffError> {
        Self::new(delays.into_iter().map(Duration::from_millis).collect())
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Number of attempts the schedule allows.
    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    /// Upper bound of time spent sleeping for one endpoint.
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for BackoffSchedule {
    /// 1s, 3s, 5s.
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5),
            ],
        }
    }
}

impl TryFrom<Vec<u64>> for BackoffSchedule {
    type Error = BackoffError;

    fn try_from(value: Vec<u64>) -> Result<Self, Self::Error> {
        Self::from_millis(value)
    }
}

impl From<BackoffSchedule> for Vec<u64> {
    fn from(value: BackoffSchedule) -> Self {
        value
            .delays
            .iter()
            .map(|d| d.as_millis() as u64)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let schedule = BackoffSchedule::default();
        assert_eq!(schedule.attempts(), 3);
        assert_eq!(
            schedule.delays(),
            &[
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5)
            ]
        );
        assert_eq!(schedule.total_delay(), Duration::from_secs(9));
    }

    #[test]
    fn test_empty_schedule_rejected() {
        assert_eq!(BackoffSchedule::new(Vec::new()), Err(BackoffError::Empty));
        assert!(serde_json::from_str::<BackoffSchedule>("[]").is_err());
    }

    #[test]
    fn test_schedule_from_json_millis() {
        let schedule: BackoffSchedule =
            serde_json::from_str("[100, 250]").unwrap();
        assert_eq!(
            schedule.delays(),
            &[Duration::from_millis(100), Duration::from_millis(250)]
        );
        assert_eq!(serde_json::to_string(&schedule).unwrap(), "[100,250]");
    }
}
