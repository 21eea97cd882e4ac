//! Job record, submission input, list filters and state patches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::JobError;
use super::ids::JobId;
use super::state::{JobStatus, ParseEnumError};

/// Priority hint attached to a job. Descriptive only: it never changes dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "priority",
                value: s.to_string(),
                expected: "low|medium|high",
            })
    }
}

/// Job record.
///
/// This is the persisted shape: camelCase field names, lowercase enums, RFC 3339
/// timestamps. The payload is carried verbatim and never looked at by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub task_name: String,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set exactly once, on entering `Completed`.
    pub completed_at: Option<DateTime<Utc>>,

    /// Failure detail, set only on entering `Failed`.
    pub error: Option<String>,
}

impl Job {
    /// Materialize a freshly submitted job. Status is always `Pending`.
    pub fn new(id: JobId, new_job: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            id,
            task_name: new_job.task_name,
            payload: new_job.payload,
            priority: new_job.priority,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error: None,
        }
    }

    /// Apply a patch verbatim. Whether the patch is allowed is the caller's business
    /// (see [`JobPatch::expect_status`]).
    pub fn apply(&mut self, patch: &JobPatch) {
        self.status = patch.status;
        if let Some(at) = patch.completed_at {
            self.completed_at = Some(at);
        }
        if let Some(error) = &patch.error {
            self.error = Some(error.clone());
        }
        self.updated_at = patch.at;
    }
}

/// Validated submission input.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    task_name: String,
    payload: serde_json::Value,
    priority: Priority,
}

impl NewJob {
    /// Validate a submission.
    ///
    /// - `task_name` must not be empty.
    /// - `payload` must be a JSON object.
    pub fn new(
        task_name: impl Into<String>,
        payload: serde_json::Value,
        priority: Priority,
    ) -> Result<Self, JobError> {
        let task_name = task_name.into();
        if task_name.is_empty() {
            return Err(JobError::validation("taskName must be a non-empty string"));
        }
        if !payload.is_object() {
            return Err(JobError::validation("payload must be a JSON object"));
        }
        Ok(Self {
            task_name,
            payload,
            priority,
        })
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

/// Listing filter. Absent fields match everything; present fields are AND-combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub priority: Option<Priority>,
}

impl JobFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|s| s == job.status)
            && self.priority.is_none_or(|p| p == job.priority)
    }
}

/// A status change for one job, optionally guarded by compare-and-set.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPatch {
    /// When set, the store applies the patch only if the current status equals this.
    pub expect_status: Option<JobStatus>,
    pub status: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Becomes the record's `updated_at`.
    pub at: DateTime<Utc>,
}

impl JobPatch {
    /// `Pending -> Running`, guarded.
    pub fn start(at: DateTime<Utc>) -> Self {
        Self {
            expect_status: Some(JobStatus::Pending),
            status: JobStatus::Running,
            completed_at: None,
            error: None,
            at,
        }
    }

    /// `Running -> Completed`, stamping `completed_at`.
    pub fn complete(at: DateTime<Utc>) -> Self {
        Self {
            expect_status: Some(JobStatus::Running),
            status: JobStatus::Completed,
            completed_at: Some(at),
            error: None,
            at,
        }
    }

    /// `Running -> Failed`, recording the failure detail.
    pub fn fail(error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            expect_status: Some(JobStatus::Running),
            status: JobStatus::Failed,
            completed_at: None,
            error: Some(error.into()),
            at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn sample_job() -> Job {
        let new_job = NewJob::new("sync", json!({"n": 1}), Priority::High).unwrap();
        Job::new(JobId::new(1), new_job, t0())
    }

    #[test]
    fn new_job_starts_pending_without_completion() {
        let job = sample_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.completed_at.is_none());
        assert!(job.error.is_none());
    }

    #[rstest]
    #[case::empty_name("", json!({}))]
    #[case::null_payload("sync", json!(null))]
    #[case::array_payload("sync", json!([1, 2]))]
    #[case::string_payload("sync", json!("x"))]
    fn new_job_rejects_bad_input(#[case] name: &str, #[case] payload: serde_json::Value) {
        let err = NewJob::new(name, payload, Priority::Low).unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));
    }

    #[test]
    fn complete_patch_sets_completed_at_once() {
        let mut job = sample_job();
        let started = t0() + chrono::Duration::seconds(1);
        let finished = t0() + chrono::Duration::seconds(4);

        job.apply(&JobPatch::start(started));
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.completed_at.is_none());
        assert_eq!(job.updated_at, started);

        job.apply(&JobPatch::complete(finished));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed_at, Some(finished));
        assert_eq!(job.created_at, t0());
    }

    #[test]
    fn fail_patch_keeps_completed_at_empty() {
        let mut job = sample_job();
        job.apply(&JobPatch::start(t0()));
        job.apply(&JobPatch::fail("boom", t0()));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn patches_only_describe_legal_edges() {
        for patch in [
            JobPatch::start(t0()),
            JobPatch::complete(t0()),
            JobPatch::fail("e", t0()),
        ] {
            let from = patch.expect_status.unwrap();
            assert!(from.can_transition_to(patch.status));
        }
    }

    #[rstest]
    #[case::everything(JobFilter::all(), true)]
    #[case::status_hit(JobFilter::all().with_status(JobStatus::Pending), true)]
    #[case::status_miss(JobFilter::all().with_status(JobStatus::Running), false)]
    #[case::both_hit(
        JobFilter::all().with_status(JobStatus::Pending).with_priority(Priority::High),
        true
    )]
    #[case::priority_miss(
        JobFilter::all().with_status(JobStatus::Pending).with_priority(Priority::Low),
        false
    )]
    fn filter_matching(#[case] filter: JobFilter, #[case] expected: bool) {
        assert_eq!(filter.matches(&sample_job()), expected);
    }

    #[test]
    fn record_serializes_in_camel_case() {
        let value = serde_json::to_value(sample_job()).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["taskName"], "sync");
        assert_eq!(value["payload"], json!({"n": 1}));
        assert_eq!(value["priority"], "high");
        assert_eq!(value["status"], "pending");
        assert!(value["createdAt"].is_string());
        assert!(value["updatedAt"].is_string());
        assert!(value["completedAt"].is_null());
    }
}
