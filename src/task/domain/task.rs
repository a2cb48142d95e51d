//! Fix-task aggregate root and lifecycle state.

use super::{
    ActorId, BranchName, Credentials, Instruction, ParseTaskStateError, RepositoryRef,
    TaskDomainError, TaskId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fix-task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Task has been accepted but nothing has been provisioned.
    Created,
    /// The worker is being provisioned.
    Launching,
    /// The worker is running.
    Running,
    /// The worker succeeded and the requester is being asked to decide.
    AwaitingApproval,
    /// The change request is being opened.
    Publishing,
    /// The change request was opened.
    Published,
    /// The branch is being deleted after rejection.
    Discarding,
    /// The branch was discarded.
    Discarded,
    /// The approval window elapsed without a decision.
    Expired,
    /// The task failed.
    Failed,
}

impl TaskState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Launching => "launching",
            Self::Running => "running",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Discarding => "discarding",
            Self::Discarded => "discarded",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    /// Returns whether the state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Published | Self::Discarded | Self::Expired | Self::Failed
        )
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Launching)
                | (Self::Launching, Self::Running | Self::Failed)
                | (Self::Running, Self::AwaitingApproval | Self::Failed)
                | (
                    Self::AwaitingApproval,
                    Self::Publishing | Self::Discarding | Self::Expired
                )
                | (Self::Publishing, Self::Published | Self::Failed)
                | (Self::Discarding, Self::Discarded)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseTaskStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "created" => Ok(Self::Created),
            "launching" => Ok(Self::Launching),
            "running" => Ok(Self::Running),
            "awaiting_approval" => Ok(Self::AwaitingApproval),
            "publishing" => Ok(Self::Publishing),
            "published" => Ok(Self::Published),
            "discarding" => Ok(Self::Discarding),
            "discarded" => Ok(Self::Discarded),
            "expired" => Ok(Self::Expired),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskStateError(value.to_owned())),
        }
    }
}

/// Validated inputs for a new fix task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFixTask {
    /// Identity of the user who requested the fix.
    pub requester: ActorId,
    /// Target repository.
    pub repository: RepositoryRef,
    /// Instruction handed to the editing agent.
    pub instruction: Instruction,
    /// Scoped credential used by the worker and the source-host client.
    pub credentials: Credentials,
}

/// Fix-task aggregate root.
///
/// Tasks live only for the duration of one orchestration flow; nothing is
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixTask {
    id: TaskId,
    requester: ActorId,
    repository: RepositoryRef,
    instruction: Instruction,
    branch_name: BranchName,
    credentials: Credentials,
    state: TaskState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FixTask {
    /// Creates a task in [`TaskState::Created`] and derives its branch name.
    #[must_use]
    pub fn new(params: NewFixTask, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        let id = TaskId::new();
        Self {
            id,
            requester: params.requester,
            repository: params.repository,
            instruction: params.instruction,
            branch_name: BranchName::generate(id, timestamp),
            credentials: params.credentials,
            state: TaskState::Created,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the requester identity.
    #[must_use]
    pub const fn requester(&self) -> &ActorId {
        &self.requester
    }

    /// Returns the target repository.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    /// Returns the instruction text.
    #[must_use]
    pub const fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    /// Returns the branch name derived at creation.
    #[must_use]
    pub const fn branch_name(&self) -> &BranchName {
        &self.branch_name
    }

    /// Returns the scoped credential.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the task to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the lifecycle
    /// table does not permit the move. The task is left unchanged.
    pub fn transition_to(
        &mut self,
        target: TaskState,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.updated_at = clock.utc();
        Ok(())
    }
}
