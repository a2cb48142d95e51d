//! Domain model for fix-task orchestration.
//!
//! The domain covers task identity, the repository and branch a task works
//! on, the lifecycle state machine, human approval decisions and terminal
//! outcomes. Infrastructure concerns stay outside this boundary.

mod approval;
mod branch;
mod credentials;
mod error;
mod ids;
mod outcome;
mod repository;
mod task;

pub use approval::{ApprovalChoice, ApprovalDecision, ApprovalRequest, GateState};
pub use branch::{BranchName, FIX_BRANCH_PREFIX};
pub use credentials::Credentials;
pub use error::{ParseApprovalChoiceError, ParseTaskStateError, TaskDomainError};
pub use ids::{ActorId, Instruction, TaskId};
pub use outcome::TaskOutcome;
pub use repository::RepositoryRef;
pub use task::{FixTask, NewFixTask, TaskState};
