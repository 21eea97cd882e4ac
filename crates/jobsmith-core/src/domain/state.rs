//! Job state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a job.
///
/// State transitions:
/// - Pending -> Running -> Completed
/// - Pending -> Running -> Failed (task body returned an error or panicked)
///
/// Nothing moves backwards and nothing skips `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Stored, waiting for a `run` request.
    Pending,

    /// Won the start transition; task body in progress.
    Running,

    /// Task body finished; `completed_at` is set.
    Completed,

    /// Task body failed; `error` is set and `completed_at` stays empty.
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a status or priority string is outside its closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}` (expected {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl FromStr for JobStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "status",
                value: s.to_string(),
                expected: "pending|running|completed|failed",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::start(JobStatus::Pending, JobStatus::Running)]
    #[case::finish(JobStatus::Running, JobStatus::Completed)]
    #[case::fail(JobStatus::Running, JobStatus::Failed)]
    fn allowed_transitions(#[case] from: JobStatus, #[case] to: JobStatus) {
        assert!(from.can_transition_to(to));
    }

    #[rstest]
    #[case::skip_running(JobStatus::Pending, JobStatus::Completed)]
    #[case::fail_before_start(JobStatus::Pending, JobStatus::Failed)]
    #[case::restart(JobStatus::Running, JobStatus::Running)]
    #[case::reopen(JobStatus::Completed, JobStatus::Pending)]
    #[case::rerun(JobStatus::Completed, JobStatus::Running)]
    #[case::revive(JobStatus::Failed, JobStatus::Running)]
    fn forbidden_transitions(#[case] from: JobStatus, #[case] to: JobStatus) {
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn parse_matches_wire_names() {
        for status in JobStatus::ALL {
            let wire = serde_json::to_value(status).unwrap();
            assert_eq!(wire, status.as_str());
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<JobStatus>().is_err());
    }
}
