//! Notifier port - best-effort delivery of completion events.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::CompletionEvent;

/// Result of one `deliver` call. Failure is a value, never an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    /// The endpoint accepted the event.
    Delivered { status: u16, attempts: u32 },

    /// No destination configured.
    Skipped,

    /// Every allowed attempt failed.
    Failed { detail: String, attempts: u32 },
}

impl DeliveryOutcome {
    pub fn delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn skipped(&self) -> bool {
        matches!(self, DeliveryOutcome::Skipped)
    }

    pub fn detail(&self) -> String {
        match self {
            DeliveryOutcome::Delivered { status, attempts } => {
                format!("delivered with status {status} after {attempts} attempt(s)")
            }
            DeliveryOutcome::Skipped => "no webhook endpoint configured".to_string(),
            DeliveryOutcome::Failed { detail, .. } => detail.clone(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Must not panic and must return within its own time bound.
    async fn deliver(&self, event: &CompletionEvent) -> DeliveryOutcome;
}
