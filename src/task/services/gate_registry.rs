//! Lookup table of approval gates that are currently waiting.

use super::ApprovalGate;
use crate::task::domain::TaskId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Maps task identifiers to their open approval gates.
///
/// The lock is held only for map operations, never across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct GateRegistry {
    gates: Arc<RwLock<HashMap<TaskId, Arc<ApprovalGate>>>>,
}

impl GateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `gate` for `task_id` until the returned guard is dropped.
    #[must_use]
    pub fn register(&self, task_id: TaskId, gate: Arc<ApprovalGate>) -> GateRegistration {
        self.gates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id, gate);
        GateRegistration {
            registry: self.clone(),
            task_id,
        }
    }

    /// Returns the open gate for `task_id`, if any.
    #[must_use]
    pub fn get(&self, task_id: TaskId) -> Option<Arc<ApprovalGate>> {
        self.gates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&task_id)
            .cloned()
    }

    /// Returns the number of open gates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether no gate is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, task_id: TaskId) {
        self.gates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_id);
    }
}

/// Keeps a gate published; removes it on drop.
#[derive(Debug)]
pub struct GateRegistration {
    registry: GateRegistry,
    task_id: TaskId,
}

impl Drop for GateRegistration {
    fn drop(&mut self) {
        self.registry.remove(self.task_id);
    }
}
