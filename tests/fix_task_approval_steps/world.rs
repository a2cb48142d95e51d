//! Shared world state for fix-task approval BDD scenarios.

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
    services::{DecisionError, FixTaskService},
};
use mockable::DefaultClock;
use rstest::fixture;
use tokio::sync::mpsc;

/// Service type used by the BDD world.
pub type TestFixTaskService = FixTaskService<
    ScriptedWorkerLauncher,
    RecordingChangeRequestClient,
    ChannelOutcomeNotifier,
    RecordingOutputSink,
    DefaultClock,
>;

/// Scenario world for fix-task approval behaviour tests.
pub struct FixTaskWorld {
    pub config: OrchestratorConfig,
    pub script: WorkerScript,
    pub requester: Option<String>,
    pub repository: Option<String>,
    pub launcher: ScriptedWorkerLauncher,
    pub client: RecordingChangeRequestClient,
    pub service: Option<TestFixTaskService>,
    pub outcomes: Option<mpsc::Receiver<(TaskId, TaskOutcome)>>,
    pub task_id: Option<TaskId>,
    pub review_url: Option<String>,
    pub last_decision: Option<Result<ApprovalDecision, DecisionError>>,
}

impl FixTaskWorld {
    /// Creates a world with default configuration and no task.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            script: WorkerScript::default(),
            requester: None,
            repository: None,
            launcher: ScriptedWorkerLauncher::new(),
            client: RecordingChangeRequestClient::new(),
            service: None,
            outcomes: None,
            task_id: None,
            review_url: None,
            last_decision: None,
        }
    }
}

impl Default for FixTaskWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> FixTaskWorld {
    FixTaskWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
