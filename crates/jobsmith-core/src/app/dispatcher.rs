//! Dispatcher - optional loop that starts pending jobs without a manual `run`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::engine::LifecycleEngine;
use crate::config::DispatcherConfig;
use crate::domain::{JobError, JobFilter, JobStatus};

/// Floor for the poll interval; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Dispatcher handle.
/// - `request_shutdown()` stops the loop after the current tick
/// - `shutdown_and_join()` also waits for it to exit
///
/// Executions already started keep running; drain them through the engine.
pub struct Dispatcher {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Dispatcher {
    pub fn spawn(engine: Arc<LifecycleEngine>, config: &DispatcherConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poll_interval = config.poll_interval().max(MIN_POLL_INTERVAL);
        let batch_size = config.batch_size;

        let join = tokio::spawn(async move {
            dispatch_loop(engine, poll_interval, batch_size, shutdown_rx).await;
        });

        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn dispatch_loop(
    engine: Arc<LifecycleEngine>,
    poll_interval: Duration,
    batch_size: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(poll_interval_ms = poll_interval.as_millis() as u64, batch_size, "dispatcher started");
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if let Err(e) = dispatch_once(&engine, batch_size).await {
            warn!(error = %e, "dispatch tick failed");
        }
    }

    info!("dispatcher stopped");
}

/// Start up to `batch_size` pending jobs, oldest first. Returns how many were started.
///
/// Jobs that a concurrent `run` already claimed come back as `Conflict` and are skipped.
pub async fn dispatch_once(engine: &LifecycleEngine, batch_size: usize) -> Result<usize, JobError> {
    let pending = engine
        .list(JobFilter::all().with_status(JobStatus::Pending))
        .await?;

    let mut started = 0;
    for job in pending.iter().rev().take(batch_size) {
        match engine.run(job.id).await {
            Ok(_) => started += 1,
            Err(JobError::Conflict { id, status }) => {
                debug!(job_id = %id, status = %status, "already claimed, skipping");
            }
            Err(JobError::NotFound(id)) => {
                debug!(job_id = %id, "vanished before dispatch, skipping");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(started)
}
