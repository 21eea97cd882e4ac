//! Impls - concrete adapters for the ports.
//!
//! - **InMemoryJobStore**: the job store used by the scheduler and its tests
//! - **WebhookNotifier**: HTTP delivery of completion events
//! - **SimulatedWork**: fixed-duration task body

pub mod inmem_store;
pub mod simulated;
pub mod webhook;

pub use self::inmem_store::InMemoryJobStore;
pub use self::simulated::SimulatedWork;
pub use self::webhook::{NotifierError, WebhookNotifier};
