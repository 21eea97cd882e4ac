//! AppBuilder - wires the engine, the service and the optional dispatcher.
//!
//! Configuration problems surface from `build()`, before any job is accepted.

use std::sync::Arc;

use tracing::info;

use super::dispatcher::Dispatcher;
use super::engine::LifecycleEngine;
use super::service::JobService;
use crate::config::{ConfigError, SchedulerConfig};
use crate::impls::{InMemoryJobStore, NotifierError, SimulatedWork, WebhookNotifier};
use crate::ports::{Clock, JobStore, Notifier, SystemClock, TaskHandler};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Notifier(#[from] NotifierError),
}

/// Builds an [`App`] from a [`SchedulerConfig`].
///
/// # Example
/// ```ignore
/// let app = AppBuilder::new(config)
///     .with_handler(Arc::new(MyHandler))
///     .build()?;
/// ```
///
/// Anything not overridden comes from the config: in-memory store, webhook notifier,
/// simulated work, wall clock.
pub struct AppBuilder {
    config: SchedulerConfig,
    store: Option<Arc<dyn JobStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    handler: Option<Arc<dyn TaskHandler>>,
    clock: Option<Arc<dyn Clock>>,
}

impl AppBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            store: None,
            notifier: None,
            handler: None,
            clock: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the config and assemble the app. The dispatcher, when enabled, is
    /// spawned here, so this must run inside a tokio runtime in that case.
    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;

        let notifier: Arc<dyn Notifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(WebhookNotifier::new(&self.config.webhook)?),
        };
        let store: Arc<dyn JobStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryJobStore::new()),
        };
        let handler: Arc<dyn TaskHandler> = match self.handler {
            Some(handler) => handler,
            None => Arc::new(SimulatedWork::new(self.config.engine.work_duration())),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        let engine = Arc::new(LifecycleEngine::new(store, notifier, handler, clock));
        let service = JobService::new(Arc::clone(&engine));

        let dispatcher = self
            .config
            .dispatcher
            .enabled
            .then(|| Dispatcher::spawn(Arc::clone(&engine), &self.config.dispatcher));

        info!(
            webhook = self.config.webhook.url.as_deref().unwrap_or("<unset>"),
            dispatcher = dispatcher.is_some(),
            "scheduler ready"
        );

        Ok(App {
            engine,
            service,
            dispatcher,
        })
    }
}

/// A wired scheduler.
pub struct App {
    pub engine: Arc<LifecycleEngine>,
    pub service: JobService,
    dispatcher: Option<Dispatcher>,
}

impl App {
    pub fn has_dispatcher(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Stop the dispatcher (if any), then wait for every in-flight execution.
    pub async fn shutdown(self) {
        if let Some(dispatcher) = self.dispatcher {
            dispatcher.shutdown_and_join().await;
        }
        self.engine.drain().await;
    }
}
