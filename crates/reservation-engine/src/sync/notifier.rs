//! Operator notifications raised when an order cannot be synced.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use tracing::error;

/// Where operator-facing alerts go. Delivery (email, chat) is up to the host.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str);
}

/// Writes notifications to the log at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl OperatorNotifier for TracingNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        error!(subject, body, "Operator notification");
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(subject, body)` pairs in the order they were raised.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl OperatorNotifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((subject.to_string(), body.to_string()));
    }
}
