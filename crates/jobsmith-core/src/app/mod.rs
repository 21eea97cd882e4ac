//! App - application layer.
//!
//! Combines the ports into the scheduler.
//!
//! # Components
//! - **LifecycleEngine**: state machine, single-winner start, background execution
//! - **JobService**: validating submission/query surface
//! - **Dispatcher**: optional loop that starts pending jobs
//! - **AppBuilder**: wiring from configuration
//! - **status**: counters and snapshots

pub mod builder;
pub mod dispatcher;
pub mod engine;
pub mod service;
pub mod status;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatcher::{Dispatcher, dispatch_once};
pub use self::engine::{LifecycleEngine, RunAck};
pub use self::service::{JobService, ListQuery, parse_job_id, parse_new_job};
pub use self::status::{EngineStats, StatusReport};
