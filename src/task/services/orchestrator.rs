//! Task orchestration state machine.
//!
//! One call to [`TaskOrchestrator::run`] drives one fix task from creation
//! to a terminal outcome:
//!
//! ```text
//! Created -> Launching -> Running -> AwaitingApproval
//!     -> Publishing -> Published
//!     -> Discarding -> Discarded
//!     -> Expired
//! (any failing step) -> Failed
//! ```
//!
//! Nothing is retried. The outcome is handed to the notifier exactly once,
//! after the terminal state has been reached.

use super::{ApprovalError, ApprovalGate, ChangeRequestTemplates, GateRegistry, OutputForwarder};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::task::{
    domain::{
        ActorId, ApprovalChoice, ApprovalDecision, ApprovalRequest, FixTask, GateState,
        ParseApprovalChoiceError, TaskDomainError, TaskId, TaskOutcome, TaskState,
    },
    ports::{
        ChangeRequest, ChangeRequestClient, OutcomeNotifier, OutputSink, WorkerExit,
        WorkerHandle, WorkerLauncher, WorkerRunError, WorkerSpec,
    },
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// How long buffered worker output may keep draining after the unit exits.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Outbound collaborators used by the orchestrator.
pub struct OrchestratorPorts<L, C, N, S> {
    /// Execution provisioner.
    pub launcher: Arc<L>,
    /// Source-host client.
    pub change_requests: Arc<C>,
    /// Terminal outcome channel.
    pub notifier: Arc<N>,
    /// Observability sink for worker output.
    pub output_sink: Arc<S>,
}

impl<L, C, N, S> Clone for OrchestratorPorts<L, C, N, S> {
    fn clone(&self) -> Self {
        Self {
            launcher: Arc::clone(&self.launcher),
            change_requests: Arc::clone(&self.change_requests),
            notifier: Arc::clone(&self.notifier),
            output_sink: Arc::clone(&self.output_sink),
        }
    }
}

/// Errors returned when routing a human decision to a task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecisionError {
    /// The task is unknown, not yet awaiting approval, or already resolved.
    #[error("task {0} is not awaiting approval")]
    NoPendingApproval(TaskId),

    /// The gate refused the decision.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// The deciding actor was malformed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// The choice was neither approve nor reject.
    #[error(transparent)]
    InvalidChoice(#[from] ParseApprovalChoiceError),
}

/// Drives fix tasks through their lifecycle.
pub struct TaskOrchestrator<L, C, N, S, K>
where
    L: WorkerLauncher,
    C: ChangeRequestClient,
    N: OutcomeNotifier,
    S: OutputSink + 'static,
    K: Clock + Send + Sync,
{
    ports: OrchestratorPorts<L, C, N, S>,
    clock: Arc<K>,
    config: OrchestratorConfig,
    templates: ChangeRequestTemplates,
    gates: GateRegistry,
}

impl<L, C, N, S, K> TaskOrchestrator<L, C, N, S, K>
where
    L: WorkerLauncher,
    C: ChangeRequestClient,
    N: OutcomeNotifier,
    S: OutputSink + 'static,
    K: Clock + Send + Sync,
{
    /// Creates an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn new(
        ports: OrchestratorPorts<L, C, N, S>,
        clock: Arc<K>,
        config: OrchestratorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let templates = ChangeRequestTemplates::from_config(&config.change_request)?;
        Ok(Self {
            ports,
            clock,
            config,
            templates,
            gates: GateRegistry::new(),
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Returns the clock used for task timestamps.
    #[must_use]
    pub const fn clock(&self) -> &Arc<K> {
        &self.clock
    }

    /// Returns the registry of gates currently awaiting a decision.
    #[must_use]
    pub const fn gates(&self) -> &GateRegistry {
        &self.gates
    }

    /// Returns the gate state for `task_id` while it awaits approval.
    #[must_use]
    pub fn gate_state(&self, task_id: TaskId) -> Option<GateState> {
        self.gates.get(task_id).map(|gate| gate.state())
    }

    /// Returns the review link for `task_id` while it awaits approval.
    #[must_use]
    pub fn review_url(&self, task_id: TaskId) -> Option<String> {
        self.gates
            .get(task_id)
            .and_then(|gate| gate.review_url().map(str::to_owned))
    }

    /// Forwards a human decision into the task's approval gate.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::NoPendingApproval`] when no gate is open for
    /// the task, or [`DecisionError::Approval`] when the gate refuses the
    /// decision. Neither changes the task.
    pub fn submit_decision(
        &self,
        task_id: TaskId,
        actor: &ActorId,
        choice: ApprovalChoice,
    ) -> Result<ApprovalDecision, DecisionError> {
        let Some(gate) = self.gates.get(task_id) else {
            debug!(%task_id, %actor, "decision for a task without an open gate");
            return Err(DecisionError::NoPendingApproval(task_id));
        };

        match gate.submit(actor, choice) {
            Ok(decision) => {
                info!(%task_id, %decision, "approval decision recorded");
                Ok(decision)
            }
            Err(err) => {
                match &err {
                    ApprovalError::Unauthorized(_) => {
                        warn!(%task_id, %actor, "ignored decision from non-requester");
                    }
                    ApprovalError::Stale(existing) => {
                        debug!(%task_id, %existing, "ignored stale decision");
                    }
                }
                Err(err.into())
            }
        }
    }

    /// Drives `task` to a terminal outcome and notifies it.
    ///
    /// Dropping the returned future abandons the task: the worker handle and
    /// output forwarder are released, the gate is unpublished, and no
    /// outcome is notified.
    #[instrument(
        name = "fix_task",
        skip_all,
        fields(
            task_id = %task.id(),
            repository = %task.repository(),
            branch = %task.branch_name(),
        )
    )]
    pub async fn run(&self, mut task: FixTask) -> TaskOutcome {
        info!("task accepted");
        let outcome = self.drive(&mut task).await;
        if task.state() != outcome.terminal_state() {
            error!(
                state = %task.state(),
                expected = %outcome.terminal_state(),
                "task state does not match its outcome"
            );
        }

        if let Err(err) = self.ports.notifier.notify(task.id(), &outcome).await {
            warn!(error = %err, "failed to deliver task outcome");
        }
        info!(%outcome, "task resolved");
        outcome
    }

    async fn drive(&self, task: &mut FixTask) -> TaskOutcome {
        self.advance(task, TaskState::Launching);
        let spec = WorkerSpec::for_task(
            task,
            self.config.worker.limits(),
            &self.config.worker.extra_env,
        );
        let handle = match self.ports.launcher.launch(&spec).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err, "worker provisioning failed");
                return self.fail(task, err.to_string());
            }
        };

        self.advance(task, TaskState::Running);
        info!(container = handle.container_ref(), "worker started");
        if let Err(err) = self.supervise(task.id(), handle).await {
            warn!(error = %err, "worker run failed");
            return self.fail(task, err.to_string());
        }

        self.advance(task, TaskState::AwaitingApproval);
        match self.await_approval(task).await {
            ApprovalDecision::Approved => self.publish(task).await,
            ApprovalDecision::Rejected => self.discard(task).await,
            ApprovalDecision::Expired => {
                info!("approval window expired, branch kept");
                self.advance(task, TaskState::Expired);
                TaskOutcome::Expired
            }
        }
    }

    /// Forwards output while waiting for the unit to exit; the handle is
    /// released before returning.
    async fn supervise(
        &self,
        task_id: TaskId,
        mut handle: Box<dyn WorkerHandle>,
    ) -> Result<(), WorkerRunError> {
        let forwarder = handle.take_output().map(|stream| {
            OutputForwarder::spawn(task_id, stream, Arc::clone(&self.ports.output_sink))
        });
        let exit = handle.wait().await;
        drop(handle);

        if let Some(running) = forwarder {
            running.finish(OUTPUT_DRAIN_GRACE).await;
        }
        exit.and_then(WorkerExit::into_result)
    }

    async fn await_approval(&self, task: &FixTask) -> ApprovalDecision {
        let review_url = match self.templates.render_review_url(task) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(error = %err, "review link template failed");
                None
            }
        };
        let unlinked = ApprovalGate::new(task.requester().clone(), self.config.approval_timeout());
        let gate = Arc::new(match &review_url {
            Some(url) => unlinked.with_review_url(url.clone()),
            None => unlinked,
        });
        let _registration = self.gates.register(task.id(), Arc::clone(&gate));
        info!(
            requester = %task.requester(),
            timeout_ms = self.config.approval_timeout_ms,
            review_url = review_url.as_deref().unwrap_or("-"),
            "awaiting approval"
        );

        let request = ApprovalRequest {
            requester: task.requester().clone(),
            branch: task.branch_name().clone(),
            review_url,
            timeout_ms: self.config.approval_timeout_ms,
        };
        if let Err(err) = self.ports.notifier.approval_requested(task.id(), &request).await {
            warn!(error = %err, "failed to deliver approval prompt");
        }
        gate.wait_for_decision().await
    }

    async fn publish(&self, task: &mut FixTask) -> TaskOutcome {
        self.advance(task, TaskState::Publishing);
        let rendered = match self.templates.render(task) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(error = %err, "change request template failed, branch kept");
                return self.fail(task, format!("publish failed: {err}"));
            }
        };
        let request = ChangeRequest {
            repository: task.repository().clone(),
            head: task.branch_name().clone(),
            base: self.config.change_request.base_branch.clone(),
            title: rendered.title,
            body: rendered.body,
        };

        match self
            .ports
            .change_requests
            .open_change_request(&request, task.credentials())
            .await
        {
            Ok(opened) => {
                info!(url = %opened.url, "change request opened");
                self.advance(task, TaskState::Published);
                TaskOutcome::pull_request_opened(opened.url)
            }
            Err(err) => {
                warn!(error = %err, "publishing failed, branch kept for manual recovery");
                self.fail(task, format!("publish failed: {err}"))
            }
        }
    }

    async fn discard(&self, task: &mut FixTask) -> TaskOutcome {
        self.advance(task, TaskState::Discarding);
        if let Err(err) = self
            .ports
            .change_requests
            .delete_branch(task.repository(), task.branch_name(), task.credentials())
            .await
        {
            warn!(error = %err, "cleanup warning: branch could not be deleted");
        }
        self.advance(task, TaskState::Discarded);
        TaskOutcome::BranchDiscarded
    }

    fn fail(&self, task: &mut FixTask, reason: String) -> TaskOutcome {
        self.advance(task, TaskState::Failed);
        TaskOutcome::worker_failed(reason)
    }

    fn advance(&self, task: &mut FixTask, target: TaskState) {
        let from = task.state();
        match task.transition_to(target, &*self.clock) {
            Ok(()) => debug!(%from, to = %target, "task state changed"),
            Err(err) => error!(error = %err, "rejected task state change"),
        }
    }
}
