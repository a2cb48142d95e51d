//! Port contracts for fix-task orchestration.
//!
//! Ports define infrastructure-agnostic interfaces used by the orchestrator:
//! the execution provisioner, the source host, and the outbound
//! notification channels.

pub mod change_request;
pub mod notifier;
pub mod worker;

pub use change_request::{
    ChangeRequest, ChangeRequestClient, ChangeRequestError, ChangeRequestResult,
    OpenedChangeRequest,
};
pub use notifier::{NotifyError, OutcomeNotifier, OutputSink};
pub use worker::{
    OutputStream, ProvisioningError, ResourceLimits, WorkerExit, WorkerHandle, WorkerLauncher,
    WorkerRunError, WorkerRunResult, WorkerSpec,
};
