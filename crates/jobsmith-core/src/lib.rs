//! jobsmith-core
//!
//! Single-node background job scheduler: jobs are submitted with a priority and an
//! opaque payload, run on request, and announced to a webhook when they complete.
//!
//! # Modules
//! - **domain**: job record, state machine, events, errors, retry policy
//! - **ports**: JobStore, Notifier, TaskHandler, Clock
//! - **impls**: InMemoryJobStore, WebhookNotifier, SimulatedWork
//! - **app**: LifecycleEngine, JobService, Dispatcher, AppBuilder
//! - **config**: TOML configuration with environment overrides
//! - **observability**: tracing setup

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{App, AppBuilder, JobService, LifecycleEngine, ListQuery, RunAck};
pub use config::SchedulerConfig;
pub use domain::{ErrorKind, Job, JobError, JobFilter, JobId, JobStatus, NewJob, Priority};
