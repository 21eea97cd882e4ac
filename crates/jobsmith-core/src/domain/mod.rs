//! Domain model (ids, job record, state machine, events, errors, retry policy).

pub mod errors;
pub mod events;
pub mod ids;
pub mod job;
pub mod retry;
pub mod state;

pub use self::errors::{ErrorKind, JobError};
pub use self::events::CompletionEvent;
pub use self::ids::{JobId, ParseJobIdError};
pub use self::job::{Job, JobFilter, JobPatch, NewJob, Priority};
pub use self::retry::RetryPolicy;
pub use self::state::{JobStatus, ParseEnumError};
