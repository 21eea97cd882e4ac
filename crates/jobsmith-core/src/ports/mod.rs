//! Ports - the seams between the lifecycle engine and everything it talks to.
//!
//! - **JobStore**: source of truth for job records, with compare-and-set status updates
//! - **Notifier**: completion events to an external endpoint
//! - **TaskHandler**: the task body
//! - **Clock**: timestamps

pub mod clock;
pub mod handler;
pub mod job_store;
pub mod notifier;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::handler::{HandlerError, TaskHandler};
pub use self::job_store::{JobCounts, JobStore, StoreError};
pub use self::notifier::{DeliveryOutcome, Notifier};
