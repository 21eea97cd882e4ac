//! TaskHandler port - the task body executed once a job is running.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Job;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Executes the work behind a job.
///
/// The handler receives a snapshot of the running job. It must not touch job state;
/// the engine records the outcome.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError>;
}
