//! Error types for fix-task domain validation and parsing.

use super::{TaskId, TaskState};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The repository locator is not a supported clone URL.
    #[error("invalid repository locator '{locator}': {reason}")]
    InvalidRepository {
        /// Locator as supplied by the requester.
        locator: String,
        /// Why the locator was rejected.
        reason: String,
    },

    /// The instruction text is empty after trimming.
    #[error("instruction text must not be empty")]
    EmptyInstruction,

    /// The actor identifier is empty after trimming.
    #[error("actor identifier must not be empty")]
    EmptyActorId,

    /// The credential token is empty after trimming.
    #[error("credential token must not be empty")]
    EmptyCredentials,

    /// The branch name violates Git ref-name constraints.
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    /// Transitioning between two lifecycle states is invalid.
    #[error("invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Current lifecycle state.
        from: TaskState,
        /// Requested target lifecycle state.
        to: TaskState,
    },
}

impl TaskDomainError {
    /// Builds an [`Self::InvalidRepository`] error.
    pub fn invalid_repository(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRepository {
            locator: locator.into(),
            reason: reason.into(),
        }
    }
}

/// Error returned while parsing task states from their canonical form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseTaskStateError(pub String);

/// Error returned while parsing an approval choice submitted by a human.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown approval choice '{0}', expected approve or reject")]
pub struct ParseApprovalChoiceError(pub String);
