//! LifecycleEngine - drives jobs from submission to a terminal state.
//!
//! # Flow of `run(id)`
//! 1. `JobStore::update` with a `Pending -> Running` compare-and-set. Exactly one caller
//!    wins; everybody else gets `Conflict` carrying the status they lost to.
//! 2. The winner spawns the execution onto the runtime and returns a [`RunAck`] at once.
//! 3. The execution runs the [`TaskHandler`] in its own task, so a panic is observed as
//!    a failure instead of tearing down the execution.
//! 4. `Running -> Completed` (or `Running -> Failed`) is written.
//! 5. Completed jobs are handed to the [`Notifier`]. The outcome is logged and counted
//!    but never touches job state.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use super::status::{EngineCounters, EngineStats, StatusReport};
use crate::domain::{
    CompletionEvent, Job, JobError, JobFilter, JobId, JobPatch, JobStatus, NewJob,
};
use crate::ports::{Clock, JobStore, Notifier, StoreError, TaskHandler};

/// Synchronous answer to `run`: the job has entered `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAck {
    pub id: JobId,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
}

/// Everything an execution needs, cloned out of the engine so the spawned task owns it.
#[derive(Clone)]
struct ExecutionContext {
    store: Arc<dyn JobStore>,
    notifier: Arc<dyn Notifier>,
    handler: Arc<dyn TaskHandler>,
    clock: Arc<dyn Clock>,
    counters: Arc<EngineCounters>,
}

/// Decrements the in-flight count however the execution ends.
struct InFlightGuard(Arc<EngineCounters>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.run_finished();
    }
}

pub struct LifecycleEngine {
    ctx: ExecutionContext,
    executions: Mutex<JoinSet<()>>,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn JobStore>,
        notifier: Arc<dyn Notifier>,
        handler: Arc<dyn TaskHandler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ctx: ExecutionContext {
                store,
                notifier,
                handler,
                clock,
                counters: Arc::new(EngineCounters::default()),
            },
            executions: Mutex::new(JoinSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.ctx.store
    }

    /// Persist a new job in `Pending`.
    pub async fn submit(&self, new_job: NewJob) -> Result<Job, JobError> {
        let job = self.ctx.store.create(new_job, self.ctx.clock.now()).await?;
        info!(
            job_id = %job.id,
            task_name = %job.task_name,
            priority = %job.priority,
            "job submitted"
        );
        Ok(job)
    }

    pub async fn get(&self, id: JobId) -> Result<Job, JobError> {
        Ok(self.ctx.store.get(id).await?)
    }

    /// Jobs matching `filter`, newest first.
    pub async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, JobError> {
        Ok(self.ctx.store.list(filter).await?)
    }

    /// Move a pending job to `Running` and start executing it in the background.
    ///
    /// # Errors
    /// - `NotFound` if the job does not exist.
    /// - `Conflict` if the job is not `Pending`, including when a concurrent `run`
    ///   for the same id won the transition.
    pub async fn run(&self, id: JobId) -> Result<RunAck, JobError> {
        let started_at = self.ctx.clock.now();
        let job = match self.ctx.store.update(id, JobPatch::start(started_at)).await {
            Ok(job) => job,
            Err(StoreError::StatusMismatch { actual, .. }) => {
                debug!(job_id = %id, status = %actual, "run rejected");
                return Err(JobError::Conflict { id, status: actual });
            }
            Err(e) => return Err(e.into()),
        };

        info!(job_id = %id, task_name = %job.task_name, "job started");
        self.spawn_execution(job);

        Ok(RunAck {
            id,
            status: JobStatus::Running,
            started_at,
        })
    }

    fn spawn_execution(&self, job: Job) {
        let ctx = self.ctx.clone();
        ctx.counters.run_started();
        let guard = InFlightGuard(Arc::clone(&ctx.counters));

        let mut executions = self.lock_executions();
        // Reap finished executions so the set only holds live ones.
        while let Some(result) = executions.try_join_next() {
            log_join_result(result);
        }
        executions.spawn(async move {
            let _guard = guard;
            execute(ctx, job).await;
        });
    }

    /// Executions currently between `Running` and their terminal write + notification.
    pub fn in_flight(&self) -> usize {
        self.ctx.counters.in_flight()
    }

    pub fn stats(&self) -> EngineStats {
        self.ctx.counters.snapshot()
    }

    pub async fn status(&self) -> Result<StatusReport, JobError> {
        Ok(StatusReport {
            engine: self.stats(),
            jobs: self.ctx.store.counts().await?,
        })
    }

    /// Wait until every spawned execution has finished, including ones spawned while
    /// draining.
    pub async fn drain(&self) {
        loop {
            let mut executions = std::mem::take(&mut *self.lock_executions());
            if executions.is_empty() {
                break;
            }
            while let Some(result) = executions.join_next().await {
                log_join_result(result);
            }
        }
        debug!("engine drained");
    }

    fn lock_executions(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.executions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "job execution task ended abnormally");
    }
}

async fn execute(ctx: ExecutionContext, job: Job) {
    let id = job.id;
    let outcome = run_task_body(Arc::clone(&ctx.handler), job).await;

    let patch = match &outcome {
        Ok(()) => JobPatch::complete(ctx.clock.now()),
        Err(detail) => JobPatch::fail(detail.clone(), ctx.clock.now()),
    };

    let job = match ctx.store.update(id, patch).await {
        Ok(job) => job,
        Err(e) => {
            record_terminal_write_failure(&ctx, id, e).await;
            return;
        }
    };

    match job.status {
        JobStatus::Completed => {
            ctx.counters.job_completed();
            info!(job_id = %id, "job completed");
            notify(&ctx, &job).await;
        }
        _ => {
            ctx.counters.job_failed();
            warn!(job_id = %id, error = job.error.as_deref().unwrap_or(""), "job failed");
        }
    }
}

/// Runs the handler on its own task; an `Err` carries a printable failure detail.
async fn run_task_body(handler: Arc<dyn TaskHandler>, job: Job) -> Result<(), String> {
    let body = tokio::spawn(async move { handler.handle(&job).await });
    match body.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) if e.is_panic() => Err(format!(
            "task body panicked: {}",
            panic_message(e.into_panic())
        )),
        Err(e) => Err(format!("task body aborted: {e}")),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The terminal write was rejected. Try once more to park the job in `Failed` so it
/// does not sit in `Running` forever; if that fails too, the error is logged and
/// counted.
async fn record_terminal_write_failure(ctx: &ExecutionContext, id: JobId, err: StoreError) {
    ctx.counters.terminal_write_error();
    error!(job_id = %id, error = %err, "failed to record terminal state");

    if !matches!(err, StoreError::Backend(_)) {
        return;
    }
    let fallback = JobPatch::fail(
        format!("could not record terminal state: {err}"),
        ctx.clock.now(),
    );
    match ctx.store.update(id, fallback).await {
        Ok(_) => {
            ctx.counters.job_failed();
            warn!(job_id = %id, "job marked failed after terminal write error");
        }
        Err(e) => {
            error!(job_id = %id, error = %e, "job left in running state");
        }
    }
}

async fn notify(ctx: &ExecutionContext, job: &Job) {
    let Some(event) = CompletionEvent::from_job(job) else {
        return;
    };
    let outcome = ctx.notifier.deliver(&event).await;
    ctx.counters.notification(&outcome);
    if outcome.delivered() || outcome.skipped() {
        debug!(job_id = %job.id, detail = %outcome.detail(), "notification handled");
    } else {
        warn!(job_id = %job.id, detail = %outcome.detail(), "notification failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use crate::impls::{InMemoryJobStore, SimulatedWork};
    use crate::ports::{DeliveryOutcome, FixedClock, HandlerError, JobCounts, SystemClock};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex as AsyncMutex;

    /// In-memory store whose first `Running -> Completed` write fails with a backend error.
    #[derive(Default)]
    struct FlakyCompletionStore {
        inner: InMemoryJobStore,
        tripped: AtomicBool,
    }

    #[async_trait]
    impl JobStore for FlakyCompletionStore {
        async fn create(&self, new_job: NewJob, now: DateTime<Utc>) -> Result<Job, StoreError> {
            self.inner.create(new_job, now).await
        }

        async fn get(&self, id: JobId) -> Result<Job, StoreError> {
            self.inner.get(id).await
        }

        async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError> {
            self.inner.list(filter).await
        }

        async fn update(&self, id: JobId, patch: JobPatch) -> Result<Job, StoreError> {
            let first_completion =
                patch.status == JobStatus::Completed && !self.tripped.swap(true, Ordering::SeqCst);
            if first_completion {
                return Err(StoreError::Backend("disk unavailable".into()));
            }
            self.inner.update(id, patch).await
        }

        async fn counts(&self) -> Result<JobCounts, StoreError> {
            self.inner.counts().await
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: AsyncMutex<Vec<CompletionEvent>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn deliver(&self, event: &CompletionEvent) -> DeliveryOutcome {
            self.events.lock().await.push(event.clone());
            DeliveryOutcome::Delivered {
                status: 200,
                attempts: 1,
            }
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl TaskHandler for FailingHandler {
        async fn handle(&self, _job: &Job) -> Result<(), HandlerError> {
            Err(HandlerError::new("disk full"))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl TaskHandler for PanickingHandler {
        async fn handle(&self, _job: &Job) -> Result<(), HandlerError> {
            panic!("worker exploded");
        }
    }

    fn engine_with(
        handler: Arc<dyn TaskHandler>,
        notifier: Arc<dyn Notifier>,
    ) -> LifecycleEngine {
        LifecycleEngine::new(
            Arc::new(InMemoryJobStore::new()),
            notifier,
            handler,
            Arc::new(SystemClock),
        )
    }

    fn quick_work() -> Arc<dyn TaskHandler> {
        Arc::new(SimulatedWork::new(Duration::from_millis(20)))
    }

    fn sync_job() -> NewJob {
        NewJob::new("sync", json!({"n": 1}), Priority::High).unwrap()
    }

    #[tokio::test]
    async fn run_completes_and_notifies_once() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(quick_work(), notifier.clone());

        let job = engine.submit(sync_job()).await.unwrap();
        let ack = engine.run(job.id).await.unwrap();
        assert_eq!(ack.status, JobStatus::Running);
        assert_eq!(engine.get(job.id).await.unwrap().status, JobStatus::Running);

        engine.drain().await;

        let done = engine.get(job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(engine.in_flight(), 0);

        let events = notifier.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].job_id, job.id);
        assert_eq!(Some(events[0].completed_at), done.completed_at);
    }

    #[tokio::test]
    async fn run_missing_job_is_not_found() {
        let engine = engine_with(quick_work(), Arc::new(RecordingNotifier::default()));
        let err = engine.run(JobId::new(99)).await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(id) if id == JobId::new(99)));
    }

    #[tokio::test]
    async fn second_run_conflicts_while_running_and_after_completion() {
        let engine = engine_with(quick_work(), Arc::new(RecordingNotifier::default()));
        let job = engine.submit(sync_job()).await.unwrap();

        engine.run(job.id).await.unwrap();
        let err = engine.run(job.id).await.unwrap_err();
        assert!(matches!(err, JobError::Conflict { status: JobStatus::Running, .. }));
        assert_eq!(err.to_string(), format!("job {} is already running", job.id));

        engine.drain().await;
        let err = engine.run(job.id).await.unwrap_err();
        assert!(matches!(err, JobError::Conflict { status: JobStatus::Completed, .. }));
    }

    #[tokio::test]
    async fn handler_error_marks_job_failed_without_notification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(Arc::new(FailingHandler), notifier.clone());
        let job = engine.submit(sync_job()).await.unwrap();

        engine.run(job.id).await.unwrap();
        engine.drain().await;

        let failed = engine.get(job.id).await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("disk full"));
        assert!(failed.completed_at.is_none());
        assert!(notifier.events.lock().await.is_empty());
        assert_eq!(engine.stats().jobs_failed, 1);

        let err = engine.run(job.id).await.unwrap_err();
        assert!(matches!(err, JobError::Conflict { status: JobStatus::Failed, .. }));
    }

    #[tokio::test]
    async fn handler_panic_marks_job_failed() {
        let engine = engine_with(
            Arc::new(PanickingHandler),
            Arc::new(RecordingNotifier::default()),
        );
        let job = engine.submit(sync_job()).await.unwrap();

        engine.run(job.id).await.unwrap();
        engine.drain().await;

        let failed = engine.get(job.id).await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.unwrap().contains("worker exploded"));
        assert_eq!(engine.in_flight(), 0);
    }

    #[tokio::test]
    async fn timestamps_come_from_the_clock() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(t0));
        let engine = LifecycleEngine::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(RecordingNotifier::default()),
            quick_work(),
            clock.clone(),
        );

        let job = engine.submit(sync_job()).await.unwrap();
        assert_eq!(job.created_at, t0);

        clock.advance(chrono::Duration::seconds(5));
        let ack = engine.run(job.id).await.unwrap();
        assert_eq!(ack.started_at, t0 + chrono::Duration::seconds(5));
        engine.drain().await;

        let done = engine.get(job.id).await.unwrap();
        assert_eq!(done.created_at, t0);
        assert_eq!(done.completed_at, Some(t0 + chrono::Duration::seconds(5)));
    }

    #[tokio::test]
    async fn backend_error_on_completion_parks_job_in_failed() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = LifecycleEngine::new(
            Arc::new(FlakyCompletionStore::default()),
            notifier.clone(),
            quick_work(),
            Arc::new(SystemClock),
        );
        let job = engine.submit(sync_job()).await.unwrap();

        engine.run(job.id).await.unwrap();
        engine.drain().await;

        let failed = engine.get(job.id).await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.unwrap().contains("disk unavailable"));
        assert!(failed.completed_at.is_none());

        let stats = engine.stats();
        assert_eq!(stats.terminal_write_errors, 1);
        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(stats.jobs_completed, 0);
        assert!(notifier.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn status_combines_engine_and_store_counts() {
        let engine = engine_with(quick_work(), Arc::new(RecordingNotifier::default()));
        let a = engine.submit(sync_job()).await.unwrap();
        engine.submit(sync_job()).await.unwrap();

        engine.run(a.id).await.unwrap();
        engine.drain().await;

        let report = engine.status().await.unwrap();
        assert_eq!(report.jobs.pending, 1);
        assert_eq!(report.jobs.completed, 1);
        assert_eq!(report.engine.runs_started, 1);
        assert_eq!(report.engine.notifications_delivered, 1);
    }
}
