//! JobStore port - durable record storage for jobs.
//!
//! The store is the single source of truth for job state. It applies no business
//! rules of its own, with one exception: [`JobPatch::expect_status`] is checked and
//! applied atomically, which is what makes `Pending -> Running` single-winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Job, JobError, JobFilter, JobId, JobPatch, JobStatus, NewJob};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(JobId),

    /// A compare-and-set patch lost: the record was not in the expected status.
    #[error("job {id} is {actual}, expected {expected}")]
    StatusMismatch {
        id: JobId,
        expected: JobStatus,
        actual: JobStatus,
    },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => JobError::NotFound(id),
            StoreError::StatusMismatch { id, actual, .. } => {
                JobError::Conflict { id, status: actual }
            }
            StoreError::Backend(msg) => JobError::Internal(msg),
        }
    }
}

/// Number of jobs per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobCounts {
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.completed + self.failed
    }
}

/// All operations are atomic per record; there are no multi-record transactions.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job with a freshly assigned id. Status is always `Pending`.
    async fn create(&self, new_job: NewJob, now: DateTime<Utc>) -> Result<Job, StoreError>;

    async fn get(&self, id: JobId) -> Result<Job, StoreError>;

    /// Jobs matching `filter`, newest first (`created_at` desc, then `id` desc).
    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError>;

    /// Apply `patch`, honouring its `expect_status` guard. Returns the updated record.
    async fn update(&self, id: JobId, patch: JobPatch) -> Result<Job, StoreError>;

    async fn counts(&self) -> Result<JobCounts, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[test]
    fn store_errors_map_onto_job_errors() {
        let id = JobId::new(5);
        assert_eq!(JobError::from(StoreError::NotFound(id)).kind(), ErrorKind::NotFound);
        assert_eq!(
            JobError::from(StoreError::Backend("disk".into())).kind(),
            ErrorKind::Internal
        );

        let conflict = JobError::from(StoreError::StatusMismatch {
            id,
            expected: JobStatus::Pending,
            actual: JobStatus::Completed,
        });
        assert_eq!(conflict.to_string(), "job 5 is already completed");
    }

    #[test]
    fn counts_record_each_status() {
        let mut counts = JobCounts::default();
        for status in JobStatus::ALL {
            counts.record(status);
        }
        counts.record(JobStatus::Pending);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), 5);
    }
}
