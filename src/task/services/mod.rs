//! Application services for fix-task orchestration.

mod approval_gate;
mod fix_task;
mod forwarder;
mod gate_registry;
mod orchestrator;
mod templates;

pub use approval_gate::{ApprovalError, ApprovalGate};
pub use fix_task::{FixTaskService, FixTaskServiceError, FixTaskServiceResult, SubmitTaskRequest};
pub use forwarder::OutputForwarder;
pub use gate_registry::{GateRegistration, GateRegistry};
pub use orchestrator::{DecisionError, OrchestratorPorts, TaskOrchestrator};
pub use templates::{ChangeRequestTemplates, RenderedChangeRequest};
