//! Error taxonomy seen by callers of the engine and the submission interface.

use thiserror::Error;

use super::ids::JobId;
use super::state::JobStatus;

/// Coarse classification of a [`JobError`], for boundary layers that map errors to
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; nothing was mutated.
    Validation,
    /// The referenced job does not exist.
    NotFound,
    /// The requested transition is illegal from the job's current state.
    Conflict,
    /// Storage or unexpected failure.
    Internal,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("job {0} not found")]
    NotFound(JobId),

    /// A well-formed id that no job can have (zero, negative, out of range).
    #[error("job {0} not found")]
    UnknownId(String),

    #[error("job {id} is already {status}")]
    Conflict { id: JobId, status: JobStatus },

    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn validation(message: impl Into<String>) -> Self {
        JobError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::Validation(_) => ErrorKind::Validation,
            JobError::NotFound(_) | JobError::UnknownId(_) => ErrorKind::NotFound,
            JobError::Conflict { .. } => ErrorKind::Conflict,
            JobError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_current_status() {
        let err = JobError::Conflict {
            id: JobId::new(3),
            status: JobStatus::Running,
        };
        assert_eq!(err.to_string(), "job 3 is already running");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(JobError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(JobError::NotFound(JobId::new(1)).kind(), ErrorKind::NotFound);
        assert_eq!(JobError::UnknownId("-3".into()).kind(), ErrorKind::NotFound);
        assert_eq!(JobError::Internal("db".into()).kind(), ErrorKind::Internal);
    }
}
