//! JobService - the submission/query surface.
//!
//! Takes loosely typed boundary input (JSON bodies, string ids, string query values),
//! validates it, and delegates to the [`LifecycleEngine`]. Validation failures never
//! reach the store.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::engine::{LifecycleEngine, RunAck};
use crate::domain::{Job, JobError, JobFilter, JobId, JobStatus, NewJob, Priority};

/// Optional list filters as they arrive from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl ListQuery {
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Empty strings count as absent; anything else must name a known value.
    pub fn to_filter(&self) -> Result<JobFilter, JobError> {
        let mut filter = JobFilter::all();
        if let Some(raw) = non_empty(self.status.as_deref()) {
            let status = raw
                .parse::<JobStatus>()
                .map_err(|e| JobError::validation(e.to_string()))?;
            filter = filter.with_status(status);
        }
        if let Some(raw) = non_empty(self.priority.as_deref()) {
            let priority = raw
                .parse::<Priority>()
                .map_err(|e| JobError::validation(e.to_string()))?;
            filter = filter.with_priority(priority);
        }
        Ok(filter)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parse a raw path segment into a [`JobId`].
///
/// Non-integers are a validation error. Integers that can never name a job are
/// reported as not found, the same as an id that was never created.
pub fn parse_job_id(raw: &str) -> Result<JobId, JobError> {
    JobId::parse_lookup(raw)
        .map_err(|e| JobError::validation(e.to_string()))?
        .ok_or_else(|| JobError::UnknownId(raw.trim().to_string()))
}

/// Validate a create-job body: `{ taskName: string, payload: object, priority: low|medium|high }`.
pub fn parse_new_job(body: &Value) -> Result<NewJob, JobError> {
    let task_name = body
        .get("taskName")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| JobError::validation("taskName is required (string)"))?;

    let payload = body
        .get("payload")
        .filter(|p| p.is_object())
        .ok_or_else(|| JobError::validation("payload must be a JSON object"))?;

    let priority = body
        .get("priority")
        .and_then(Value::as_str)
        .and_then(|p| p.parse::<Priority>().ok())
        .ok_or_else(|| JobError::validation("priority must be low|medium|high"))?;

    NewJob::new(task_name, payload.clone(), priority)
}

#[derive(Clone)]
pub struct JobService {
    engine: Arc<LifecycleEngine>,
}

impl JobService {
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        Self { engine }
    }

    pub async fn create(&self, body: &Value) -> Result<Job, JobError> {
        let new_job = parse_new_job(body)?;
        self.engine.submit(new_job).await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Job>, JobError> {
        let filter = query.to_filter()?;
        self.engine.list(filter).await
    }

    pub async fn get(&self, raw_id: &str) -> Result<Job, JobError> {
        let id = parse_job_id(raw_id)?;
        self.engine.get(id).await
    }

    pub async fn run(&self, raw_id: &str) -> Result<RunAck, JobError> {
        let id = parse_job_id(raw_id)?;
        self.engine.run(id).await
    }
}
