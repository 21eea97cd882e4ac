//! In-memory job store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{Job, JobFilter, JobId, JobPatch, NewJob};
use crate::ports::{JobCounts, JobStore, StoreError};

/// In-memory store state.
struct InMemoryJobStoreState {
    /// All job records (single source of truth).
    jobs: HashMap<JobId, Job>,

    /// Next job ID to assign.
    next_job_id: u64,
}

impl InMemoryJobStoreState {
    fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            next_job_id: 1,
        }
    }

    fn allocate_job_id(&mut self) -> JobId {
        let id = JobId::new(self.next_job_id);
        self.next_job_id += 1;
        id
    }
}

/// Job store backed by a `HashMap` under one async mutex.
///
/// Every operation takes the lock once and releases it before returning, so the
/// compare-and-set in [`JobStore::update`] is atomic with respect to every other call.
pub struct InMemoryJobStore {
    state: Mutex<InMemoryJobStoreState>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryJobStoreState::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.jobs.is_empty()
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, new_job: NewJob, now: DateTime<Utc>) -> Result<Job, StoreError> {
        let mut state = self.state.lock().await;
        let id = state.allocate_job_id();
        let job = Job::new(id, new_job, now);
        state.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: JobId) -> Result<Job, StoreError> {
        let state = self.state.lock().await;
        state.jobs.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = {
            let state = self.state.lock().await;
            state
                .jobs
                .values()
                .filter(|job| filter.matches(job))
                .cloned()
                .collect()
        };
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(jobs)
    }

    async fn update(&self, id: JobId, patch: JobPatch) -> Result<Job, StoreError> {
        let mut state = self.state.lock().await;
        let job = state.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if let Some(expected) = patch.expect_status
            && job.status != expected
        {
            return Err(StoreError::StatusMismatch {
                id,
                expected,
                actual: job.status,
            });
        }

        job.apply(&patch);
        Ok(job.clone())
    }

    async fn counts(&self) -> Result<JobCounts, StoreError> {
        let state = self.state.lock().await;
        let mut counts = JobCounts::default();
        for job in state.jobs.values() {
            counts.record(job.status);
        }
        Ok(counts)
    }
}
