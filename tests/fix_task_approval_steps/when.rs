//! When steps for fix-task approval BDD scenarios.

use super::world::{FixTaskWorld, run_async};
use eyre::WrapErr;
use ghost_coder::task::{
    adapters::{
        channel::ChannelOutcomeNotifier,
        memory::{RecordingOutputSink, ScriptedWorkerLauncher},
    },
    services::{FixTaskService, OrchestratorPorts, SubmitTaskRequest, TaskOrchestrator},
};
use mockable::DefaultClock;
use rstest_bdd_macros::when;
use std::sync::Arc;
use std::time::Duration;

#[when("the task is submitted")]
fn task_is_submitted(world: &mut FixTaskWorld) -> Result<(), eyre::Report> {
    let requester = world
        .requester
        .clone()
        .ok_or_else(|| eyre::eyre!("missing requester in scenario world"))?;
    let repository = world
        .repository
        .clone()
        .ok_or_else(|| eyre::eyre!("missing repository in scenario world"))?;

    world.launcher = ScriptedWorkerLauncher::always(world.script.clone());
    let (notifier, outcomes) = ChannelOutcomeNotifier::channel(4);
    let ports = OrchestratorPorts {
        launcher: Arc::new(world.launcher.clone()),
        change_requests: Arc::new(world.client.clone()),
        notifier: Arc::new(notifier),
        output_sink: Arc::new(RecordingOutputSink::new()),
    };
    let orchestrator = TaskOrchestrator::new(ports, Arc::new(DefaultClock), world.config.clone())
        .wrap_err("build orchestrator for scenario")?;
    let service = FixTaskService::new(Arc::new(orchestrator));

    let task_id = service
        .submit_task(SubmitTaskRequest::new(
            requester,
            repository,
            "fix the failing build",
            "scenario-token",
        ))
        .wrap_err("submit scenario task")?;

    world.task_id = Some(task_id);
    world.service = Some(service);
    world.outcomes = Some(outcomes);
    Ok(())
}

#[when(r#""{actor}" answers "{choice}""#)]
fn actor_answers(world: &mut FixTaskWorld, actor: String, choice: String) -> Result<(), eyre::Report> {
    let service = world
        .service
        .as_ref()
        .ok_or_else(|| eyre::eyre!("task has not been submitted"))?;
    let task_id = world
        .task_id
        .ok_or_else(|| eyre::eyre!("missing task id in scenario world"))?;

    run_async(async {
        for _ in 0..400 {
            if service.orchestrator().gate_state(task_id).is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });
    if let Some(url) = service.orchestrator().review_url(task_id) {
        world.review_url = Some(url);
    }
    world.last_decision = Some(service.submit_raw_decision(task_id, &actor, &choice));
    Ok(())
}
