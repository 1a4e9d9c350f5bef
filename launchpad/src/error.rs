//! Hard failures of the launch phase.
//!
//! "Not yet" conditions (runners still starting, a runner not answering its
//! probe) are not errors; they surface as [`crate::LaunchOutcome`] values.

use thiserror::Error;

use crate::cluster::StatusConflict;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("could not list runner pods for {load_test} ({selector})")]
    ListRunners {
        load_test: String,
        selector: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("load test {load_test} has zero parallelism")]
    InvalidParallelism { load_test: String },

    #[error("could not list runner services for {load_test} ({selector})")]
    ListServices {
        load_test: String,
        selector: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    StatusConflict(#[from] StatusConflict),

    #[error("could not update status of {load_test}")]
    StatusUpdate {
        load_test: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create starter job {starter}")]
    CreateStarter {
        starter: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LaunchError {
    /// True when retrying the whole phase is expected to succeed once the
    /// caller re-reads the load test.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LaunchError::StatusConflict(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LaunchError::ListRunners { .. } => "list_runners",
            LaunchError::InvalidParallelism { .. } => "invalid_parallelism",
            LaunchError::ListServices { .. } => "list_services",
            LaunchError::StatusConflict(_) => "status_conflict",
            LaunchError::StatusUpdate { .. } => "status_update",
            LaunchError::CreateStarter { .. } => "create_starter",
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;
