//! Shared test helpers for in-memory orchestration integration tests.

use ghost_coder::config::OrchestratorConfig;
use ghost_coder::task::{
    adapters::{
        channel::ChannelOutcomeNotifier,
        memory::{
            RecordingChangeRequestClient, RecordingOutputSink, ScriptedWorkerLauncher,
            WorkerScript,
        },
    },
    domain::{ApprovalDecision, TaskId, TaskOutcome},
    services::{
        DecisionError, FixTaskService, OrchestratorPorts, SubmitTaskRequest, TaskOrchestrator,
    },
};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Service type wired with in-memory adapters.
pub type InMemoryService = FixTaskService<
    ScriptedWorkerLauncher,
    RecordingChangeRequestClient,
    ChannelOutcomeNotifier,
    RecordingOutputSink,
    DefaultClock,
>;

/// Service plus handles on every in-memory adapter it uses.
pub struct Stack {
    pub service: InMemoryService,
    pub launcher: ScriptedWorkerLauncher,
    pub client: RecordingChangeRequestClient,
    pub sink: RecordingOutputSink,
    pub outcomes: mpsc::Receiver<(TaskId, TaskOutcome)>,
}

impl Stack {
    /// Builds a stack whose workers follow `script`.
    #[must_use]
    pub fn new(script: WorkerScript, config: OrchestratorConfig) -> Self {
        let launcher = ScriptedWorkerLauncher::always(script);
        let client = RecordingChangeRequestClient::new();
        let sink = RecordingOutputSink::new();
        let (notifier, outcomes) = ChannelOutcomeNotifier::channel(64);
        let ports = OrchestratorPorts {
            launcher: Arc::new(launcher.clone()),
            change_requests: Arc::new(client.clone()),
            notifier: Arc::new(notifier),
            output_sink: Arc::new(sink.clone()),
        };
        let orchestrator = TaskOrchestrator::new(ports, Arc::new(DefaultClock), config)
            .expect("test configuration is valid");
        Self {
            service: FixTaskService::new(Arc::new(orchestrator)),
            launcher,
            client,
            sink,
            outcomes,
        }
    }

    /// Submits a decision once the task's gate is open.
    ///
    /// # Errors
    ///
    /// Returns the refusal when the gate rejects the decision, or
    /// [`DecisionError::NoPendingApproval`] when the gate never opened.
    pub async fn decide_when_ready(
        &self,
        task_id: TaskId,
        actor: &str,
        choice: &str,
    ) -> Result<ApprovalDecision, DecisionError> {
        for _ in 0..400 {
            if self.service.orchestrator().gate_state(task_id).is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.service.submit_raw_decision(task_id, actor, choice)
    }

    /// Waits for the next outcome.
    ///
    /// # Errors
    ///
    /// Returns an error when no outcome arrives within five seconds.
    pub async fn next_outcome(&mut self) -> eyre::Result<(TaskId, TaskOutcome)> {
        tokio::time::timeout(Duration::from_secs(5), self.outcomes.recv())
            .await?
            .ok_or_else(|| eyre::eyre!("outcome channel closed"))
    }
}

/// Provides a stack whose workers succeed and print two lines.
#[fixture]
pub fn stack() -> Stack {
    Stack::new(
        WorkerScript::succeed(["cloning repository", "pushing branch"]),
        OrchestratorConfig::default(),
    )
}

/// Builds a request from `requester` against the test repository.
#[must_use]
pub fn fix_request(requester: &str, instruction: &str) -> SubmitTaskRequest {
    SubmitTaskRequest::new(
        requester,
        "https://github.com/acme/widgets.git",
        instruction,
        format!("token-for-{requester}"),
    )
}
