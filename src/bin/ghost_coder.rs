//! Runs one Ghost Coder fix task from the terminal.
//!
//! Usage:
//!
//! ```text
//! GITHUB_TOKEN=... ghost-coder --repo https://github.com/owner/repo fix the flaky test
//! ```
//!
//! Worker output is logged as it arrives. Once the worker finishes, type
//! `approve` or `reject` on stdin; without a decision the task expires when
//! the approval window closes and the branch is left in place.

use clap::Parser;
use ghost_coder::config::OrchestratorConfig;
use ghost_coder::task::{
    adapters::{
        channel::ChannelOutcomeNotifier, docker::DockerWorkerLauncher, github::GitHubClient,
        log::TracingOutputSink,
    },
    domain::{TaskId, TaskOutcome},
    ports::{ChangeRequestClient, OutcomeNotifier, OutputSink, WorkerLauncher},
    services::{
        DecisionError, FixTaskService, OrchestratorPorts, SubmitTaskRequest, TaskOrchestrator,
    },
};
use mockable::{Clock, DefaultClock};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Exit code reported when the approval window closed without a decision.
const EXIT_EXPIRED: u8 = 2;
/// Exit code reported after an interrupt.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "ghost-coder", version, about = "Run a supervised automated fix")]
struct Args {
    /// Scoped source-host token handed to the worker.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Repository clone URL.
    #[arg(long)]
    repo: String,

    /// Identity allowed to approve or reject the result.
    #[arg(long, env = "USER", default_value = "local")]
    requester: String,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker image, overriding the configuration.
    #[arg(long, env = "GHOST_CODER_IMAGE")]
    image: Option<String>,

    /// Approval window in seconds, overriding the configuration.
    #[arg(long)]
    approval_timeout_secs: Option<u64>,

    /// Base branch for the pull request, overriding the configuration.
    #[arg(long)]
    base: Option<String>,

    /// Instruction for the editing agent.
    #[arg(required = true, trailing_var_arg = true)]
    task: Vec<String>,
}

fn load_config(args: &Args) -> eyre::Result<OrchestratorConfig> {
    let mut config = match &args.config {
        Some(path) => OrchestratorConfig::from_json_file(path)?,
        None => OrchestratorConfig::default(),
    };
    if let Some(image) = &args.image {
        config.worker.image.clone_from(image);
    }
    if let Some(secs) = args.approval_timeout_secs {
        config = config.with_approval_timeout(Duration::from_secs(secs));
    }
    if let Some(base) = &args.base {
        config.change_request.base_branch.clone_from(base);
    }
    config.validate()?;
    Ok(config)
}

fn exit_code(outcome: &TaskOutcome) -> ExitCode {
    match outcome {
        TaskOutcome::PullRequestOpened { .. } | TaskOutcome::BranchDiscarded => ExitCode::SUCCESS,
        TaskOutcome::Expired => ExitCode::from(EXIT_EXPIRED),
        TaskOutcome::WorkerFailed { .. } => ExitCode::FAILURE,
    }
}

fn handle_line<L, C, N, S, K>(
    service: &FixTaskService<L, C, N, S, K>,
    task_id: TaskId,
    requester: &str,
    line: &str,
) where
    L: WorkerLauncher + 'static,
    C: ChangeRequestClient + 'static,
    N: OutcomeNotifier + 'static,
    S: OutputSink + 'static,
    K: Clock + Send + Sync + 'static,
{
    let choice = line.trim();
    if choice.is_empty() {
        return;
    }
    match service.submit_raw_decision(task_id, requester, choice) {
        Ok(decision) => info!(%decision, "decision recorded"),
        Err(DecisionError::NoPendingApproval(_)) => {
            warn!("no approval pending yet, wait for the worker to finish");
        }
        Err(err) => warn!(error = %err, "decision ignored"),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    ghost_coder::telemetry::init("info")?;
    let args = Args::parse();
    let config = load_config(&args)?;

    let (notifier, mut outcomes) = ChannelOutcomeNotifier::channel(1);
    let ports = OrchestratorPorts {
        launcher: Arc::new(DockerWorkerLauncher::from_config(&config.worker)),
        change_requests: Arc::new(GitHubClient::new(&config.github)?),
        notifier: Arc::new(notifier),
        output_sink: Arc::new(TracingOutputSink),
    };
    let orchestrator = TaskOrchestrator::new(ports, Arc::new(DefaultClock), config)?;
    let service = FixTaskService::new(Arc::new(orchestrator));

    let task_id = service.submit_task(SubmitTaskRequest::new(
        args.requester.as_str(),
        args.repo.as_str(),
        args.task.join(" "),
        args.token.as_str(),
    ))?;
    info!(%task_id, "task started; type 'approve' or 'reject' once the worker finishes");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            received = outcomes.recv() => {
                let Some((finished, outcome)) = received else {
                    warn!("outcome channel closed before the task resolved");
                    return Ok(ExitCode::FAILURE);
                };
                if finished == task_id {
                    info!(%outcome, "task finished");
                    return Ok(exit_code(&outcome));
                }
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(text)) => handle_line(&service, task_id, &args.requester, &text),
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "stopped reading decisions from stdin");
                    stdin_open = false;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("interrupted, abandoning the task");
                service.shutdown().await;
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        }
    }
}
