//! Adapters that report through `tracing`.

use crate::task::{
    domain::{ApprovalRequest, TaskId, TaskOutcome},
    ports::{NotifyError, OutcomeNotifier, OutputSink},
};
use async_trait::async_trait;
use tracing::{info, warn};

/// Emits worker output lines as `tracing` events under the
/// `ghost_coder::worker` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOutputSink;

#[async_trait]
impl OutputSink for TracingOutputSink {
    async fn forward_line(&self, task_id: TaskId, line: &str) -> Result<(), NotifyError> {
        info!(target: "ghost_coder::worker", %task_id, "{line}");
        Ok(())
    }
}

/// Emits each approval prompt and terminal outcome as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOutcomeNotifier;

#[async_trait]
impl OutcomeNotifier for TracingOutcomeNotifier {
    async fn approval_requested(
        &self,
        task_id: TaskId,
        request: &ApprovalRequest,
    ) -> Result<(), NotifyError> {
        info!(
            %task_id,
            requester = %request.requester,
            branch = %request.branch,
            review_url = request.review_url.as_deref().unwrap_or("-"),
            "approve or reject the pushed branch"
        );
        Ok(())
    }

    async fn notify(&self, task_id: TaskId, outcome: &TaskOutcome) -> Result<(), NotifyError> {
        match outcome {
            TaskOutcome::PullRequestOpened { url } => {
                info!(%task_id, %url, "pull request opened");
            }
            TaskOutcome::BranchDiscarded => info!(%task_id, "branch discarded"),
            TaskOutcome::Expired => info!(%task_id, "approval expired, branch kept"),
            TaskOutcome::WorkerFailed { reason } => warn!(%task_id, %reason, "task failed"),
        }
        Ok(())
    }
}
