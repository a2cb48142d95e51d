//! Inbound service used by the front-end to submit tasks and decisions.

use super::{DecisionError, TaskOrchestrator};
use crate::task::{
    domain::{
        ActorId, ApprovalChoice, ApprovalDecision, Credentials, FixTask, Instruction,
        NewFixTask, RepositoryRef, TaskDomainError, TaskId,
    },
    ports::{ChangeRequestClient, OutcomeNotifier, OutputSink, WorkerLauncher},
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Request payload for a new fix task, as received from the front-end.
#[derive(Clone, PartialEq, Eq)]
pub struct SubmitTaskRequest {
    requester: String,
    repository: String,
    instruction: String,
    credentials: String,
}

impl SubmitTaskRequest {
    /// Creates a request with all required fields.
    #[must_use]
    pub fn new(
        requester: impl Into<String>,
        repository: impl Into<String>,
        instruction: impl Into<String>,
        credentials: impl Into<String>,
    ) -> Self {
        Self {
            requester: requester.into(),
            repository: repository.into(),
            instruction: instruction.into(),
            credentials: credentials.into(),
        }
    }

    fn validate(self) -> Result<NewFixTask, TaskDomainError> {
        Ok(NewFixTask {
            requester: ActorId::new(self.requester)?,
            repository: RepositoryRef::parse(&self.repository)?,
            instruction: Instruction::new(self.instruction)?,
            credentials: Credentials::new(self.credentials)?,
        })
    }
}

impl std::fmt::Debug for SubmitTaskRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitTaskRequest")
            .field("requester", &self.requester)
            .field("repository", &self.repository)
            .field("instruction", &self.instruction)
            .field("credentials", &"[redacted]")
            .finish()
    }
}

/// Service-level errors for task submission.
#[derive(Debug, Error)]
pub enum FixTaskServiceError {
    /// Request validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
}

/// Result type for fix-task service operations.
pub type FixTaskServiceResult<T> = Result<T, FixTaskServiceError>;

type InFlight = Arc<Mutex<HashMap<TaskId, JoinHandle<()>>>>;

/// Accepts fix requests and runs each one on its own tokio task.
///
/// Task flows share nothing but the orchestrator's gate registry and the
/// table of in-flight handles used for shutdown.
pub struct FixTaskService<L, C, N, S, K>
where
    L: WorkerLauncher + 'static,
    C: ChangeRequestClient + 'static,
    N: OutcomeNotifier + 'static,
    S: OutputSink + 'static,
    K: Clock + Send + Sync + 'static,
{
    orchestrator: Arc<TaskOrchestrator<L, C, N, S, K>>,
    in_flight: InFlight,
}

impl<L, C, N, S, K> Clone for FixTaskService<L, C, N, S, K>
where
    L: WorkerLauncher + 'static,
    C: ChangeRequestClient + 'static,
    N: OutcomeNotifier + 'static,
    S: OutputSink + 'static,
    K: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<L, C, N, S, K> FixTaskService<L, C, N, S, K>
where
    L: WorkerLauncher + 'static,
    C: ChangeRequestClient + 'static,
    N: OutcomeNotifier + 'static,
    S: OutputSink + 'static,
    K: Clock + Send + Sync + 'static,
{
    /// Creates a service around `orchestrator`.
    #[must_use]
    pub fn new(orchestrator: Arc<TaskOrchestrator<L, C, N, S, K>>) -> Self {
        Self {
            orchestrator,
            in_flight: Arc::default(),
        }
    }

    /// Returns the orchestrator driving the tasks.
    #[must_use]
    pub const fn orchestrator(&self) -> &Arc<TaskOrchestrator<L, C, N, S, K>> {
        &self.orchestrator
    }

    /// Validates `request`, creates the task and starts its flow.
    ///
    /// Must be called from within a tokio runtime. The outcome is delivered
    /// through the orchestrator's notifier.
    ///
    /// # Errors
    ///
    /// Returns [`FixTaskServiceError::Domain`] when the requester,
    /// repository locator, instruction or credential is invalid. Nothing is
    /// started in that case.
    pub fn submit_task(&self, request: SubmitTaskRequest) -> FixTaskServiceResult<TaskId> {
        let params = request.validate()?;
        let task = FixTask::new(params, &**self.orchestrator.clock());
        let task_id = task.id();

        let orchestrator = Arc::clone(&self.orchestrator);
        let in_flight = Arc::clone(&self.in_flight);
        // Hold the table while spawning so the flow cannot deregister itself
        // before it has been registered.
        let mut table = lock(&self.in_flight);
        let handle = tokio::spawn(async move {
            orchestrator.run(task).await;
            lock(&in_flight).remove(&task_id);
        });
        table.insert(task_id, handle);
        drop(table);

        info!(%task_id, "fix task submitted");
        Ok(task_id)
    }

    /// Forwards a typed decision to the task's approval gate.
    ///
    /// # Errors
    ///
    /// See [`TaskOrchestrator::submit_decision`].
    pub fn submit_decision(
        &self,
        task_id: TaskId,
        actor: &ActorId,
        choice: ApprovalChoice,
    ) -> Result<ApprovalDecision, DecisionError> {
        self.orchestrator.submit_decision(task_id, actor, choice)
    }

    /// Parses and forwards a raw decision from the front-end.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Domain`] when the actor is empty,
    /// [`DecisionError::InvalidChoice`] when the choice is not recognised,
    /// and otherwise behaves as [`Self::submit_decision`].
    pub fn submit_raw_decision(
        &self,
        task_id: TaskId,
        actor: &str,
        choice: &str,
    ) -> Result<ApprovalDecision, DecisionError> {
        let actor_id = ActorId::new(actor)?;
        let parsed = ApprovalChoice::try_from(choice)?;
        self.submit_decision(task_id, &actor_id, parsed)
    }

    /// Returns whether the task's flow is still running.
    #[must_use]
    pub fn is_in_flight(&self, task_id: TaskId) -> bool {
        lock(&self.in_flight).contains_key(&task_id)
    }

    /// Returns the number of flows still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Abandons every in-flight flow.
    ///
    /// Aborting a flow drops its worker handle, which tears the execution
    /// unit down, and unpublishes its approval gate. Abandoned tasks are
    /// not notified.
    pub async fn shutdown(&self) {
        let handles: Vec<(TaskId, JoinHandle<()>)> = lock(&self.in_flight).drain().collect();
        if !handles.is_empty() {
            info!(count = handles.len(), "abandoning in-flight tasks");
        }
        for (task_id, handle) in handles {
            handle.abort();
            match handle.await {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {}
                Err(err) => warn!(%task_id, error = %err, "task flow ended abnormally"),
            }
        }
    }
}

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<TaskId, JoinHandle<()>>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}
