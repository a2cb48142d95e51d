//! In-memory adapters for deterministic orchestration flows.

mod change_request;
mod notifier;
mod worker;

pub use change_request::{RecordedDeletion, RecordingChangeRequestClient};
pub use notifier::{RecordingOutcomeNotifier, RecordingOutputSink};
pub use worker::{ScriptedWorkerLauncher, WorkerScript};
