//! Execution provisioner port: launching an isolated worker and observing
//! its run.

use crate::task::domain::{BranchName, Credentials, FixTask, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Environment variable carrying the scoped source-host token.
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
/// Environment variable carrying the repository clone URL.
pub const ENV_REPO_URL: &str = "REPO_URL";
/// Environment variable carrying the instruction text.
pub const ENV_USER_TASK: &str = "USER_TASK";
/// Environment variable carrying the branch the worker must push.
pub const ENV_BRANCH_NAME: &str = "BRANCH_NAME";

/// Environment variable names reserved for task parameters.
pub const RESERVED_ENV: [&str; 4] = [ENV_GITHUB_TOKEN, ENV_REPO_URL, ENV_USER_TASK, ENV_BRANCH_NAME];

/// Resource caps applied to each execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Hard memory limit in bytes.
    pub memory_bytes: u64,
    /// Optional CPU quota, in cores.
    pub cpus: Option<f64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_bytes: 1024 * 1024 * 1024,
            cpus: None,
        }
    }
}

/// Everything a launcher needs to provision one execution unit.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSpec {
    /// Task the unit belongs to.
    pub task_id: TaskId,
    /// Scoped credential; the only secret passed to the unit.
    pub credentials: Credentials,
    /// Clone URL of the target repository.
    pub repository_url: String,
    /// Instruction handed to the editing agent.
    pub instruction: String,
    /// Branch the worker must push its change to.
    pub branch_name: BranchName,
    /// Resource caps.
    pub limits: ResourceLimits,
    /// Operator-configured, non-secret environment entries.
    pub extra_env: BTreeMap<String, String>,
}

impl WorkerSpec {
    /// Builds the spec for `task`.
    ///
    /// Extra entries whose names collide with the task parameters are
    /// dropped so they can never override them.
    #[must_use]
    pub fn for_task(
        task: &FixTask,
        limits: ResourceLimits,
        extra_env: &BTreeMap<String, String>,
    ) -> Self {
        let extra_env = extra_env
            .iter()
            .filter(|(key, _)| !RESERVED_ENV.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            task_id: task.id(),
            credentials: task.credentials().clone(),
            repository_url: task.repository().clone_url(),
            instruction: task.instruction().as_str().to_owned(),
            branch_name: task.branch_name().clone(),
            limits,
            extra_env,
        }
    }

    /// Returns the full environment for the unit, task parameters first.
    #[must_use]
    pub fn environment(&self) -> Vec<(String, String)> {
        let task_env = [
            (ENV_GITHUB_TOKEN, self.credentials.expose().to_owned()),
            (ENV_REPO_URL, self.repository_url.clone()),
            (ENV_USER_TASK, self.instruction.clone()),
            (ENV_BRANCH_NAME, self.branch_name.as_str().to_owned()),
        ];
        task_env
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value))
            .chain(
                self.extra_env
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            )
            .collect()
    }
}

/// Lazy, append-only sequence of worker output lines.
///
/// The stream stays open while the unit runs and closes once every producer
/// has finished, i.e. after the unit terminates.
#[derive(Debug)]
pub struct OutputStream {
    receiver: mpsc::Receiver<String>,
}

impl OutputStream {
    /// Creates a connected producer/stream pair with the given buffer size.
    #[must_use]
    pub fn channel(buffer: usize) -> (mpsc::Sender<String>, Self) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (sender, Self { receiver })
    }

    /// Returns the next line, or `None` once the stream has closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

/// Exit status reported by an execution unit.
///
/// Only an explicit `0` counts as success; a missing or unreadable status is
/// treated as failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerExit {
    code: Option<i64>,
}

impl WorkerExit {
    /// Creates an exit status from an optional code.
    #[must_use]
    pub const fn new(code: Option<i64>) -> Self {
        Self { code }
    }

    /// Creates an exit status with the given code.
    #[must_use]
    pub const fn with_code(code: i64) -> Self {
        Self { code: Some(code) }
    }

    /// Creates an exit status for a unit whose code could not be read.
    #[must_use]
    pub const fn missing() -> Self {
        Self { code: None }
    }

    /// Returns the exit code, if any.
    #[must_use]
    pub const fn code(self) -> Option<i64> {
        self.code
    }

    /// Returns whether the run succeeded.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Converts the status into a run result.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerRunError::NonZeroExit`] or
    /// [`WorkerRunError::MissingExitStatus`] for unsuccessful runs.
    pub const fn into_result(self) -> Result<(), WorkerRunError> {
        match self.code {
            Some(0) => Ok(()),
            Some(code) => Err(WorkerRunError::NonZeroExit(code)),
            None => Err(WorkerRunError::MissingExitStatus),
        }
    }
}

/// One running execution unit.
///
/// Dropping a handle before [`WorkerHandle::wait`] returns must tear the
/// unit down; adapters own that guarantee.
#[async_trait]
pub trait WorkerHandle: Send {
    /// Returns the opaque reference of the execution unit.
    fn container_ref(&self) -> &str;

    /// Returns when the unit was started.
    fn started_at(&self) -> DateTime<Utc>;

    /// Takes the output stream. Returns `None` on every call after the
    /// first.
    fn take_output(&mut self) -> Option<OutputStream>;

    /// Suspends until the unit exits.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerRunError::Wait`] when the status cannot be obtained
    /// from the runtime.
    async fn wait(&mut self) -> WorkerRunResult<WorkerExit>;
}

/// Launches execution units for fix tasks.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Provisions and starts a unit for `spec`.
    ///
    /// The unit must cap resources according to `spec.limits` and remove
    /// itself when it finishes, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError`] when the unit cannot be created.
    async fn launch(&self, spec: &WorkerSpec) -> Result<Box<dyn WorkerHandle>, ProvisioningError>;
}

/// Result type for worker run operations.
pub type WorkerRunResult<T> = Result<T, WorkerRunError>;

/// The execution unit could not be created.
#[derive(Debug, Clone, Error)]
pub enum ProvisioningError {
    /// The runtime refused the request.
    #[error("worker provisioning rejected: {0}")]
    Rejected(String),

    /// The runtime could not be reached or failed while provisioning.
    #[error("worker provisioning failed: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProvisioningError {
    /// Wraps a runtime error from the launcher adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}

/// The execution unit ran but did not signal success.
#[derive(Debug, Clone, Error)]
pub enum WorkerRunError {
    /// The unit exited with a non-zero code.
    #[error("non-zero exit: {0}")]
    NonZeroExit(i64),

    /// The unit exited without a readable status.
    #[error("missing exit status")]
    MissingExitStatus,

    /// Waiting on the unit failed.
    #[error("worker wait failed: {0}")]
    Wait(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkerRunError {
    /// Wraps a wait error from the launcher adapter.
    pub fn wait(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Wait(Arc::new(err))
    }
}
