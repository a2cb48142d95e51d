//! Adapter implementations for the fix-task ports.
//!
//! - [`docker`] runs workers as containers through the Docker CLI.
//! - [`github`] talks to the GitHub REST API.
//! - [`channel`] and [`log`] deliver outcomes and worker output in-process.
//! - [`memory`] provides scripted and recording doubles for tests and
//!   local dry runs.

pub mod channel;
pub mod docker;
pub mod github;
pub mod log;
pub mod memory;
