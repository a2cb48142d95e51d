//! Ghost Coder: supervised, human-approved automated code fixes.
//!
//! A fix task runs an editing agent in an isolated container against a
//! repository branch, streams the container's output, and then waits a
//! bounded time for the requester to approve or reject the result. Approval
//! opens a pull request; rejection deletes the branch; silence leaves the
//! branch in place.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: task identity, lifecycle state machine and outcomes
//! - **Ports**: worker launcher, source-host client and notifier traits
//! - **Adapters**: Docker, GitHub REST, in-process channels and doubles
//! - **Services**: approval gate and task orchestrator
//!
//! # Modules
//!
//! - [`config`]: explicit orchestrator configuration
//! - [`task`]: fix-task orchestration
//! - [`telemetry`]: `tracing` subscriber setup

pub mod config;
pub mod task;
pub mod telemetry;
