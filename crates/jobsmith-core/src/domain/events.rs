//! Completion event handed to the notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::JobId;
use super::job::{Job, Priority};

/// Snapshot of a completed job, as delivered to the webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub job_id: JobId,
    pub task_name: String,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

impl CompletionEvent {
    /// Returns `None` unless the job has actually completed.
    pub fn from_job(job: &Job) -> Option<Self> {
        let completed_at = job.completed_at?;
        Some(Self {
            job_id: job.id,
            task_name: job.task_name.clone(),
            priority: job.priority,
            payload: job.payload.clone(),
            completed_at,
        })
    }
}
