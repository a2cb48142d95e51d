//! Fix-task orchestration.
//!
//! A task moves from launch, through a supervised worker run, to a human
//! approval gate and finally to publication, discard or expiry. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
