//! Worker launcher that runs each task in a Docker container.
//!
//! The container is started with `docker run --rm`, so the runtime removes
//! it once it stops. Task parameters are passed as `-e NAME` flags whose
//! values come from the CLI process environment, which keeps the credential
//! off the command line.

use crate::config::WorkerConfig;
use crate::task::{
    domain::TaskId,
    ports::{
        OutputStream, ProvisioningError, WorkerExit, WorkerHandle, WorkerLauncher,
        WorkerRunError, WorkerRunResult, WorkerSpec,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Buffered output lines per container before readers apply backpressure.
const OUTPUT_BUFFER: usize = 256;

/// Label attached to every worker container.
const TASK_LABEL: &str = "ghost-coder.task";

/// Launches workers through the Docker CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerWorkerLauncher {
    docker_binary: String,
    image: String,
}

impl DockerWorkerLauncher {
    /// Creates a launcher that runs `image` with `docker_binary`.
    pub fn new(docker_binary: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            docker_binary: docker_binary.into(),
            image: image.into(),
        }
    }

    /// Creates a launcher from worker configuration.
    #[must_use]
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.docker_binary.clone(), config.image.clone())
    }

    /// Returns the container name used for `task_id`.
    #[must_use]
    pub fn container_name(task_id: TaskId) -> String {
        format!("ghost-coder-{task_id}")
    }

    /// Returns the `docker` arguments used to run `spec`.
    ///
    /// Environment values are never part of the arguments.
    #[must_use]
    pub fn run_args(&self, spec: &WorkerSpec) -> Vec<String> {
        let mut args = vec![
            "run".to_owned(),
            "--rm".to_owned(),
            "--name".to_owned(),
            Self::container_name(spec.task_id),
            "--label".to_owned(),
            format!("{TASK_LABEL}={}", spec.task_id),
            "--memory".to_owned(),
            format!("{}b", spec.limits.memory_bytes),
        ];
        if let Some(cpus) = spec.limits.cpus {
            args.push("--cpus".to_owned());
            args.push(cpus.to_string());
        }
        for (key, _) in spec.environment() {
            args.push("-e".to_owned());
            args.push(key);
        }
        args.push(self.image.clone());
        args
    }

    fn command(&self, spec: &WorkerSpec) -> Command {
        let mut command = Command::new(&self.docker_binary);
        command
            .args(self.run_args(spec))
            .envs(spec.environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl WorkerLauncher for DockerWorkerLauncher {
    #[instrument(skip_all, fields(task_id = %spec.task_id, image = %self.image))]
    async fn launch(&self, spec: &WorkerSpec) -> Result<Box<dyn WorkerHandle>, ProvisioningError> {
        let container_name = Self::container_name(spec.task_id);
        let mut child = self
            .command(spec)
            .spawn()
            .map_err(ProvisioningError::runtime)?;
        debug!(container = %container_name, "docker run started");

        let (sender, stream) = OutputStream::channel(OUTPUT_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, sender.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, sender);
        }

        Ok(Box::new(DockerWorkerHandle {
            container_name,
            docker_binary: self.docker_binary.clone(),
            started_at: Utc::now(),
            child,
            output: Some(stream),
            exited: false,
        }))
    }
}

fn spawn_line_reader<R>(reader: R, sender: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if sender.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    debug!(error = %err, "worker output read failed");
                    break;
                }
            }
        }
    });
}

struct DockerWorkerHandle {
    container_name: String,
    docker_binary: String,
    started_at: DateTime<Utc>,
    child: Child,
    output: Option<OutputStream>,
    exited: bool,
}

#[async_trait]
impl WorkerHandle for DockerWorkerHandle {
    fn container_ref(&self) -> &str {
        &self.container_name
    }

    fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn take_output(&mut self) -> Option<OutputStream> {
        self.output.take()
    }

    async fn wait(&mut self) -> WorkerRunResult<WorkerExit> {
        let status = self.child.wait().await.map_err(WorkerRunError::wait)?;
        self.exited = true;
        debug!(container = %self.container_name, code = ?status.code(), "container exited");
        Ok(WorkerExit::new(status.code().map(i64::from)))
    }
}

impl Drop for DockerWorkerHandle {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        // Killing the CLI client does not stop the container.
        let docker_binary = self.docker_binary.clone();
        let container_name = self.container_name.clone();
        std::thread::spawn(move || {
            let result = std::process::Command::new(&docker_binary)
                .args(["rm", "--force", &container_name])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            if let Err(err) = result {
                warn!(container = %container_name, error = %err, "failed to remove abandoned container");
            }
        });
    }
}
