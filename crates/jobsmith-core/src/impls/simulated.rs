//! SimulatedWork - fixed-duration stand-in for a real task body.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::Job;
use crate::ports::{HandlerError, TaskHandler};

/// Sleeps for a fixed duration and succeeds. The payload is not inspected.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    duration: Duration,
}

impl SimulatedWork {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[async_trait]
impl TaskHandler for SimulatedWork {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        debug!(job_id = %job.id, duration_ms = self.duration.as_millis() as u64, "simulating work");
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}
