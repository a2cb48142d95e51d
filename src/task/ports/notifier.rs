//! Outcome notification and worker-output observation ports.

use crate::task::domain::{ApprovalRequest, TaskId, TaskOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Receives the terminal outcome of each task, exactly once per task, and
/// the approval prompt for tasks whose worker succeeded.
#[async_trait]
pub trait OutcomeNotifier: Send + Sync {
    /// Presents the approval prompt for `task_id` to the requester.
    ///
    /// Called once, after the gate opens. The default does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails. The gate stays open
    /// regardless.
    async fn approval_requested(
        &self,
        _task_id: TaskId,
        _request: &ApprovalRequest,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    /// Delivers `outcome` for `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails. The orchestrator logs
    /// the failure and does not retry.
    async fn notify(&self, task_id: TaskId, outcome: &TaskOutcome) -> Result<(), NotifyError>;
}

/// Observability collaborator receiving worker output lines.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Forwards one output line.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the line cannot be forwarded. Failures
    /// are logged and never affect the task.
    async fn forward_line(&self, task_id: TaskId, line: &str) -> Result<(), NotifyError>;
}

/// Delivery failure for notifications and forwarded output.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// The receiving side has gone away.
    #[error("notification receiver closed")]
    Closed,

    /// Delivery failed in the adapter.
    #[error("notification delivery failed: {0}")]
    Delivery(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotifyError {
    /// Wraps a delivery error from the adapter.
    pub fn delivery(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Delivery(Arc::new(err))
    }
}
