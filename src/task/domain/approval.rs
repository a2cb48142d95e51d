//! Human approval choices and decisions.

use super::{ActorId, BranchName, ParseApprovalChoiceError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action a reviewer can take on a finished worker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalChoice {
    /// Publish the branch as a change request.
    Approve,
    /// Discard the branch.
    Reject,
}

impl ApprovalChoice {
    /// Returns the canonical string form, matching the front-end's action
    /// identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for ApprovalChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ApprovalChoice {
    type Error = ParseApprovalChoiceError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseApprovalChoiceError(value.to_owned())),
        }
    }
}

/// Resolved outcome of an approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// The requester approved the change.
    Approved,
    /// The requester rejected the change.
    Rejected,
    /// No decision arrived within the approval window.
    Expired,
}

impl ApprovalDecision {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl From<ApprovalChoice> for ApprovalDecision {
    fn from(choice: ApprovalChoice) -> Self {
        match choice {
            ApprovalChoice::Approve => Self::Approved,
            ApprovalChoice::Reject => Self::Rejected,
        }
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of an approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateState {
    /// No decision has been recorded yet.
    Waiting,
    /// The gate resolved; the decision is final.
    Resolved(ApprovalDecision),
}

impl GateState {
    /// Returns the decision when the gate has resolved.
    #[must_use]
    pub const fn decision(self) -> Option<ApprovalDecision> {
        match self {
            Self::Waiting => None,
            Self::Resolved(decision) => Some(decision),
        }
    }
}

/// Prompt shown to the requester once a worker run succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// The only actor who may decide.
    pub requester: ActorId,
    /// Branch the worker pushed.
    pub branch: BranchName,
    /// Link for inspecting the branch before deciding, when one could be
    /// rendered.
    pub review_url: Option<String>,
    /// Approval window in milliseconds.
    pub timeout_ms: u64,
}
