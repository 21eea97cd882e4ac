//! WebhookNotifier - POSTs completion events to a configured URL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::WebhookConfig;
use crate::domain::{CompletionEvent, RetryPolicy};
use crate::ports::{DeliveryOutcome, Notifier};

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("invalid webhook url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Delivers [`CompletionEvent`]s as JSON over HTTP.
///
/// - No URL configured: every delivery is [`DeliveryOutcome::Skipped`].
/// - Each attempt, including the wait for a free slot, is bounded by the timeout.
/// - Non-2xx, timeouts and transport errors count as failed attempts; retries follow
///   the [`RetryPolicy`] (single attempt by default).
pub struct WebhookNotifier {
    client: Client,
    endpoint: Option<Url>,
    timeout: Duration,
    retry: RetryPolicy,
    slots: Arc<Semaphore>,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Result<Self, NotifierError> {
        let endpoint = config
            .url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| NotifierError::InvalidUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint,
            timeout: config.timeout(),
            retry: config.retry_policy(),
            slots: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
        })
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    /// One bounded attempt.
    async fn attempt(&self, url: &Url, event: &CompletionEvent) -> Result<StatusCode, String> {
        match tokio::time::timeout(self.timeout, self.send(url, event)).await {
            Ok(result) => result,
            Err(_) => Err(format!("timed out after {}ms", self.timeout.as_millis())),
        }
    }

    async fn send(&self, url: &Url, event: &CompletionEvent) -> Result<StatusCode, String> {
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| "notifier is closed".to_string())?;

        let response = self
            .client
            .post(url.clone())
            .header("content-type", "application/json")
            .json(event)
            .send()
            .await
            .map_err(|e| describe_transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            Ok(status)
        } else {
            Err(format!("endpoint responded with status {status}"))
        }
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("transport error: {err}")
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, event: &CompletionEvent) -> DeliveryOutcome {
        let Some(url) = &self.endpoint else {
            debug!(job_id = %event.job_id, "webhook url not set, skipping notification");
            return DeliveryOutcome::Skipped;
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(url, event).await {
                Ok(status) => {
                    let code = status.as_u16();
                    info!(job_id = %event.job_id, status = code, attempts, "webhook sent");
                    return DeliveryOutcome::Delivered {
                        status: status.as_u16(),
                        attempts,
                    };
                }
                Err(detail) if !self.retry.should_retry(attempts) => {
                    warn!(job_id = %event.job_id, attempts, error = %detail, "webhook failed");
                    return DeliveryOutcome::Failed { detail, attempts };
                }
                Err(detail) => {
                    let delay = self.retry.next_delay_with_jitter(attempts);
                    debug!(
                        job_id = %event.job_id,
                        attempt = attempts,
                        error = %detail,
                        delay_ms = delay.as_millis() as u64,
                        "webhook attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
