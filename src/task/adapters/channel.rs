//! Outcome notifier backed by a tokio channel.

use crate::task::{
    domain::{TaskId, TaskOutcome},
    ports::{NotifyError, OutcomeNotifier},
};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sends each outcome to a front-end receiver.
#[derive(Debug, Clone)]
pub struct ChannelOutcomeNotifier {
    sender: mpsc::Sender<(TaskId, TaskOutcome)>,
}

impl ChannelOutcomeNotifier {
    /// Creates a notifier and the receiver its outcomes arrive on.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<(TaskId, TaskOutcome)>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl OutcomeNotifier for ChannelOutcomeNotifier {
    async fn notify(&self, task_id: TaskId, outcome: &TaskOutcome) -> Result<(), NotifyError> {
        self.sender
            .send((task_id, outcome.clone()))
            .await
            .map_err(|_| NotifyError::Closed)
    }
}
