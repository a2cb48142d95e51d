//! Scripted worker launcher.

use crate::task::ports::{
    OutputStream, ProvisioningError, WorkerExit, WorkerHandle, WorkerLauncher, WorkerRunResult,
    WorkerSpec,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Behaviour of one scripted execution unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerScript {
    /// Emit `lines`, then exit with `exit`.
    Exit {
        /// Output lines, in order.
        lines: Vec<String>,
        /// Reported exit status.
        exit: WorkerExit,
    },
    /// Emit `lines`, then keep running until the handle is dropped.
    Hang {
        /// Output lines, in order.
        lines: Vec<String>,
    },
    /// Refuse to provision the unit.
    Reject(String),
}

impl WorkerScript {
    /// Emits `lines` and exits with code `0`.
    #[must_use]
    pub fn succeed<I, T>(lines: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::exit_with(lines, WorkerExit::with_code(0))
    }

    /// Emits `lines` and exits with `exit`.
    #[must_use]
    pub fn exit_with<I, T>(lines: I, exit: WorkerExit) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::Exit {
            lines: lines.into_iter().map(Into::into).collect(),
            exit,
        }
    }
}

impl Default for WorkerScript {
    fn default() -> Self {
        Self::succeed(Vec::<String>::new())
    }
}

/// Launcher that plays back queued scripts instead of starting containers.
///
/// Scripts are consumed in launch order; once the queue is empty the
/// fallback script is used. Every spec passed to
/// [`WorkerLauncher::launch`] is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedWorkerLauncher {
    state: Arc<RwLock<LauncherState>>,
    live_units: Arc<AtomicUsize>,
}

#[derive(Debug, Default)]
struct LauncherState {
    queued: VecDeque<WorkerScript>,
    fallback: WorkerScript,
    launched: Vec<WorkerSpec>,
}

impl ScriptedWorkerLauncher {
    /// Creates a launcher whose units succeed without output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a launcher that uses `script` for every unit.
    #[must_use]
    pub fn always(script: WorkerScript) -> Self {
        let launcher = Self::new();
        launcher.write_state().fallback = script;
        launcher
    }

    /// Queues `script` for the next launch.
    pub fn push_script(&self, script: WorkerScript) {
        self.write_state().queued.push_back(script);
    }

    /// Returns every spec launched so far.
    #[must_use]
    pub fn launched(&self) -> Vec<WorkerSpec> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .launched
            .clone()
    }

    /// Returns the number of provisioned units whose handle is still alive.
    #[must_use]
    pub fn live_units(&self) -> usize {
        self.live_units.load(Ordering::SeqCst)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, LauncherState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WorkerLauncher for ScriptedWorkerLauncher {
    async fn launch(&self, spec: &WorkerSpec) -> Result<Box<dyn WorkerHandle>, ProvisioningError> {
        let script = {
            let mut state = self.state.write().map_err(|err| {
                ProvisioningError::runtime(std::io::Error::other(err.to_string()))
            })?;
            state.launched.push(spec.clone());
            let fallback = state.fallback.clone();
            state.queued.pop_front().unwrap_or(fallback)
        };

        let (lines, exit) = match script {
            WorkerScript::Reject(reason) => return Err(ProvisioningError::Rejected(reason)),
            WorkerScript::Exit { lines, exit } => (lines, Some(exit)),
            WorkerScript::Hang { lines } => (lines, None),
        };

        let (sender, stream) = OutputStream::channel(lines.len());
        for line in lines {
            if sender.try_send(line).is_err() {
                break;
            }
        }
        drop(sender);

        self.live_units.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedWorkerHandle {
            container_ref: format!("scripted-{}", spec.task_id.short()),
            started_at: Utc::now(),
            output: Some(stream),
            exit,
            live_units: Arc::clone(&self.live_units),
        }))
    }
}

struct ScriptedWorkerHandle {
    container_ref: String,
    started_at: DateTime<Utc>,
    output: Option<OutputStream>,
    exit: Option<WorkerExit>,
    live_units: Arc<AtomicUsize>,
}

#[async_trait]
impl WorkerHandle for ScriptedWorkerHandle {
    fn container_ref(&self) -> &str {
        &self.container_ref
    }

    fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn take_output(&mut self) -> Option<OutputStream> {
        self.output.take()
    }

    async fn wait(&mut self) -> WorkerRunResult<WorkerExit> {
        match self.exit {
            Some(exit) => Ok(exit),
            None => std::future::pending().await,
        }
    }
}

impl Drop for ScriptedWorkerHandle {
    fn drop(&mut self) {
        self.live_units.fetch_sub(1, Ordering::SeqCst);
    }
}
