//! Engine counters and their serializable snapshot.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::ports::{DeliveryOutcome, JobCounts};

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub in_flight: usize,
    pub runs_started: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub notifications_delivered: u64,
    pub notifications_failed: u64,
    pub notifications_skipped: u64,
    /// Terminal-state writes the store rejected; those jobs may still read `running`.
    pub terminal_write_errors: u64,
}

/// Combined engine and store view, as printed by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub engine: EngineStats,
    pub jobs: JobCounts,
}

#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    in_flight: AtomicUsize,
    runs_started: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    notifications_delivered: AtomicU64,
    notifications_failed: AtomicU64,
    notifications_skipped: AtomicU64,
    terminal_write_errors: AtomicU64,
}

impl EngineCounters {
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn run_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn job_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn terminal_write_error(&self) {
        self.terminal_write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn notification(&self, outcome: &DeliveryOutcome) {
        let counter = match outcome {
            DeliveryOutcome::Delivered { .. } => &self.notifications_delivered,
            DeliveryOutcome::Skipped => &self.notifications_skipped,
            DeliveryOutcome::Failed { .. } => &self.notifications_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EngineStats {
        EngineStats {
            in_flight: self.in_flight(),
            runs_started: self.runs_started.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            notifications_delivered: self.notifications_delivered.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            notifications_skipped: self.notifications_skipped.load(Ordering::Relaxed),
            terminal_write_errors: self.terminal_write_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let counters = EngineCounters::default();
        counters.run_started();
        counters.run_started();
        counters.run_finished();
        counters.job_completed();
        counters.notification(&DeliveryOutcome::Skipped);
        counters.notification(&DeliveryOutcome::Failed {
            detail: "x".into(),
            attempts: 1,
        });

        let stats = counters.snapshot();
        assert_eq!(stats.in_flight, 1);
        assert_eq!(stats.runs_started, 2);
        assert_eq!(stats.jobs_completed, 1);
        assert_eq!(stats.notifications_skipped, 1);
        assert_eq!(stats.notifications_failed, 1);
        assert_eq!(stats.notifications_delivered, 0);
    }
}
