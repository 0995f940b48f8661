//! Outbound status notifications.
//!
//! Every document status change emits a fire-and-forget event for an external
//! realtime layer. Delivery failures are logged, never propagated into the
//! pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ProcessingStatus;
use crate::repository::JobCounts;

/// A document status change, as broadcast to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub document_id: String,
    pub document_title: String,
    pub status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Completion percentage, 0-100.
    pub progress: u8,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(
        document_id: impl Into<String>,
        document_title: impl Into<String>,
        status: ProcessingStatus,
        counts: JobCounts,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            document_title: document_title.into(),
            status,
            message: None,
            metadata: None,
            progress: compute_progress(status, counts),
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Completion percentage for a document.
///
/// Without jobs the status alone decides; once a plan exists, progress is the
/// share of terminal jobs.
pub fn compute_progress(status: ProcessingStatus, counts: JobCounts) -> u8 {
    if counts.total == 0 {
        return match status {
            ProcessingStatus::Pending => 0,
            ProcessingStatus::Processing => 50,
            ProcessingStatus::Completed => 100,
            ProcessingStatus::Failed => 0,
        };
    }
    let ratio = counts.terminal as f64 / counts.total as f64;
    (ratio * 100.0).round() as u8
}

/// Consumer of status change events.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn document_status_changed(&self, event: StatusEvent);
}

/// Default notifier that writes events to the log.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl StatusNotifier for LogNotifier {
    async fn document_status_changed(&self, event: StatusEvent) {
        tracing::info!(
            document_id = %event.document_id,
            status = event.status.as_str(),
            progress = event.progress,
            message = event.message.as_deref().unwrap_or(""),
            "document status changed"
        );
    }
}

/// Notifier that forwards events over a channel, for the CLI and tests.
pub struct ChannelNotifier {
    tx: tokio::sync::mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl StatusNotifier for ChannelNotifier {
    async fn document_status_changed(&self, event: StatusEvent) {
        // Receiver may be gone; notification is fire-and-forget.
        let _ = self.tx.send(event);
    }
}
