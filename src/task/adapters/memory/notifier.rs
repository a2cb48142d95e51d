//! Recording outcome notifier and output sink.

use crate::task::{
    domain::{ApprovalRequest, TaskId, TaskOutcome},
    ports::{NotifyError, OutcomeNotifier, OutputSink},
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Notifier that stores every approval prompt and delivered outcome.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutcomeNotifier {
    prompts: Arc<Mutex<Vec<(TaskId, ApprovalRequest)>>>,
    delivered: Arc<Mutex<Vec<(TaskId, TaskOutcome)>>>,
    closed: Arc<AtomicBool>,
}

impl RecordingOutcomeNotifier {
    /// Creates an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes later deliveries fail with [`NotifyError::Closed`]. Failed
    /// deliveries are still recorded.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns every delivered outcome, in delivery order.
    #[must_use]
    pub fn delivered(&self) -> Vec<(TaskId, TaskOutcome)> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns every approval prompt, in delivery order.
    #[must_use]
    pub fn approval_requests(&self) -> Vec<(TaskId, ApprovalRequest)> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the outcomes delivered for `task_id`.
    #[must_use]
    pub fn outcomes_for(&self, task_id: TaskId) -> Vec<TaskOutcome> {
        self.delivered()
            .into_iter()
            .filter(|(id, _)| *id == task_id)
            .map(|(_, outcome)| outcome)
            .collect()
    }
}

#[async_trait]
impl OutcomeNotifier for RecordingOutcomeNotifier {
    async fn approval_requested(
        &self,
        task_id: TaskId,
        request: &ApprovalRequest,
    ) -> Result<(), NotifyError> {
        self.prompts
            .lock()
            .map_err(|err| NotifyError::delivery(std::io::Error::other(err.to_string())))?
            .push((task_id, request.clone()));
        if self.closed.load(Ordering::SeqCst) {
            return Err(NotifyError::Closed);
        }
        Ok(())
    }

    async fn notify(&self, task_id: TaskId, outcome: &TaskOutcome) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .map_err(|err| NotifyError::delivery(std::io::Error::other(err.to_string())))?
            .push((task_id, outcome.clone()));
        if self.closed.load(Ordering::SeqCst) {
            return Err(NotifyError::Closed);
        }
        Ok(())
    }
}

/// Output sink that stores every forwarded line.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutputSink {
    lines: Arc<Mutex<Vec<(TaskId, String)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingOutputSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later forward fail without recording the line.
    pub fn fail_forwarding(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Returns the lines forwarded for `task_id`, in order.
    #[must_use]
    pub fn lines_for(&self, task_id: TaskId) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| *id == task_id)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

#[async_trait]
impl OutputSink for RecordingOutputSink {
    async fn forward_line(&self, task_id: TaskId, line: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Closed);
        }
        self.lines
            .lock()
            .map_err(|err| NotifyError::delivery(std::io::Error::other(err.to_string())))?
            .push((task_id, line.to_owned()));
        Ok(())
    }
}
