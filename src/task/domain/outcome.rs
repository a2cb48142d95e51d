//! Terminal task outcomes reported to the outcome notifier.

use super::TaskState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal record of a fix task. Exactly one is produced per task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The requester approved and a change request was opened.
    PullRequestOpened {
        /// Browser URL of the opened change request.
        url: String,
    },
    /// The requester rejected; the branch was discarded (best-effort).
    BranchDiscarded,
    /// The task failed before publication.
    WorkerFailed {
        /// Human-readable failure reason.
        reason: String,
    },
    /// No decision arrived within the approval window; the branch is kept.
    Expired,
}

impl TaskOutcome {
    /// Builds a [`Self::WorkerFailed`] outcome.
    pub fn worker_failed(reason: impl Into<String>) -> Self {
        Self::WorkerFailed {
            reason: reason.into(),
        }
    }

    /// Builds a [`Self::PullRequestOpened`] outcome.
    pub fn pull_request_opened(url: impl Into<String>) -> Self {
        Self::PullRequestOpened { url: url.into() }
    }

    /// Returns the change request URL when one was opened.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::PullRequestOpened { url } => Some(url),
            Self::BranchDiscarded | Self::WorkerFailed { .. } | Self::Expired => None,
        }
    }

    /// Returns the failure reason for failed tasks.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::WorkerFailed { reason } => Some(reason),
            Self::PullRequestOpened { .. } | Self::BranchDiscarded | Self::Expired => None,
        }
    }

    /// Returns the lifecycle state a task ends in with this outcome.
    #[must_use]
    pub const fn terminal_state(&self) -> TaskState {
        match self {
            Self::PullRequestOpened { .. } => TaskState::Published,
            Self::BranchDiscarded => TaskState::Discarded,
            Self::WorkerFailed { .. } => TaskState::Failed,
            Self::Expired => TaskState::Expired,
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PullRequestOpened { url } => write!(f, "pull request opened: {url}"),
            Self::BranchDiscarded => f.write_str("branch discarded"),
            Self::WorkerFailed { reason } => write!(f, "failed: {reason}"),
            Self::Expired => f.write_str("approval window expired"),
        }
    }
}
