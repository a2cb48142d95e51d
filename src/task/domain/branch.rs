//! Branch-name value object shared by the worker and the change-request
//! client.

use super::{TaskDomainError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix applied to every generated fix branch.
pub const FIX_BRANCH_PREFIX: &str = "ghost-coder-fix";

/// Maximum length for a validated branch name.
const MAX_BRANCH_NAME_LENGTH: usize = 200;

/// Character sequences Git refuses in ref names, plus `:` which the
/// source-host API treats as an owner delimiter in `head` values.
const FORBIDDEN_SEQUENCES: [&str; 10] = ["..", "~", "^", ":", "?", "*", "[", "\\", "@{", "//"];

/// Validated Git branch name.
///
/// A fix task derives its branch name exactly once, at creation time; the
/// name is the join key between the branch the worker pushes and the later
/// open or delete calls against the source host.
///
/// # Examples
///
///     use ghost_coder::task::domain::BranchName;
///
///     let name = BranchName::new("ghost-coder-fix-1700000000000").expect("valid");
///     assert_eq!(name.as_str(), "ghost-coder-fix-1700000000000");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidBranchName`] when the value is empty,
    /// contains whitespace, control characters or a forbidden sequence,
    /// starts or ends with `/` or `.`, ends with `.lock`, or exceeds the
    /// length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        if Self::is_invalid_branch_name(&raw) {
            return Err(TaskDomainError::InvalidBranchName(raw));
        }
        Ok(Self(raw))
    }

    /// Derives the branch name for a task created at `created_at`.
    ///
    /// The name combines the creation time in Unix milliseconds with the
    /// short task identifier, so two tasks created within the same
    /// millisecond still receive distinct branches.
    #[must_use]
    pub fn generate(task_id: TaskId, created_at: DateTime<Utc>) -> Self {
        Self(format!(
            "{FIX_BRANCH_PREFIX}-{}-{}",
            created_at.timestamp_millis(),
            task_id.short()
        ))
    }

    fn is_invalid_branch_name(name: &str) -> bool {
        let is_empty = name.is_empty();
        let exceeds_length_limit = name.len() > MAX_BRANCH_NAME_LENGTH;
        let has_bad_char = name
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control());
        let has_forbidden_sequence = FORBIDDEN_SEQUENCES.iter().any(|seq| name.contains(seq));
        let has_bad_edges = name.starts_with(['/', '.', '-'])
            || name.ends_with(['/', '.'])
            || name.ends_with(".lock");

        is_empty || exceeds_length_limit || has_bad_char || has_forbidden_sequence || has_bad_edges
    }

    /// Returns the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for BranchName {
    type Error = TaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
