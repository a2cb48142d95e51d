//! Single-task flows driven through the public service.

use super::helpers::{Stack, fix_request, stack};
use eyre::{bail, ensure};
use ghost_coder::config::OrchestratorConfig;
use ghost_coder::task::{
    adapters::memory::WorkerScript,
    domain::{ApprovalDecision, TaskOutcome},
    ports::{ChangeRequestError, WorkerExit},
    services::DecisionError,
};
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approved_task_publishes_from_the_pushed_branch(mut stack: Stack) -> eyre::Result<()> {
    let task_id = stack
        .service
        .submit_task(fix_request("alice", "fix the login redirect"))?;

    let decision = stack.decide_when_ready(task_id, "alice", "approve").await?;
    let (reported, outcome) = stack.next_outcome().await?;

    ensure!(decision == ApprovalDecision::Approved);
    ensure!(reported == task_id);
    ensure!(outcome.url() == Some("https://github.com/acme/widgets/pull/1"));

    let launched = stack.launcher.launched();
    let opened = stack.client.opened();
    let ([spec], [request]) = (launched.as_slice(), opened.as_slice()) else {
        bail!("expected one launch and one change request");
    };
    ensure!(request.head == spec.branch_name);
    ensure!(request.base == "main");
    ensure!(request.body.ends_with("Task: fix the login redirect"));
    ensure!(stack.client.deleted().is_empty());
    ensure!(
        stack.client.credentials_seen().iter().map(|c| c.expose()).collect::<Vec<_>>()
            == ["token-for-alice"]
    );
    ensure!(stack.sink.lines_for(task_id) == ["cloning repository", "pushing branch"]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_task_deletes_its_branch(mut stack: Stack) -> eyre::Result<()> {
    let task_id = stack
        .service
        .submit_task(fix_request("alice", "rename the config flag"))?;

    stack.decide_when_ready(task_id, "alice", "reject").await?;
    let (_, outcome) = stack.next_outcome().await?;

    ensure!(outcome == TaskOutcome::BranchDiscarded);
    let launched = stack.launcher.launched();
    let deleted = stack.client.deleted();
    let ([spec], [deletion]) = (launched.as_slice(), deleted.as_slice()) else {
        bail!("expected one launch and one deletion");
    };
    ensure!(deletion.branch == spec.branch_name);
    ensure!(deletion.repository.full_name() == "acme/widgets");
    ensure!(stack.client.opened().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_task_is_discarded_even_when_deletion_fails(
    mut stack: Stack,
) -> eyre::Result<()> {
    stack.client.fail_delete_with(ChangeRequestError::Rejected {
        status: 422,
        message: "Reference does not exist".to_owned(),
    });
    let task_id = stack.service.submit_task(fix_request("alice", "tidy imports"))?;

    stack.decide_when_ready(task_id, "alice", "reject").await?;
    let (_, outcome) = stack.next_outcome().await?;

    ensure!(outcome == TaskOutcome::BranchDiscarded);
    ensure!(stack.client.deleted().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_worker_skips_the_gate_and_the_host() -> eyre::Result<()> {
    let mut stack = Stack::new(
        WorkerScript::exit_with(["out of memory"], WorkerExit::with_code(137)),
        OrchestratorConfig::default(),
    );
    let task_id = stack.service.submit_task(fix_request("alice", "optimise the parser"))?;

    let (_, outcome) = stack.next_outcome().await?;

    ensure!(outcome == TaskOutcome::worker_failed("non-zero exit: 137"));
    ensure!(stack.client.call_count() == 0);
    ensure!(
        stack.service.submit_raw_decision(task_id, "alice", "approve")
            == Err(DecisionError::NoPendingApproval(task_id))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unanswered_task_expires_and_keeps_its_branch() -> eyre::Result<()> {
    let config = OrchestratorConfig::default().with_approval_timeout(Duration::from_millis(20));
    let mut stack = Stack::new(WorkerScript::default(), config);
    let task_id = stack.service.submit_task(fix_request("alice", "bump the MSRV"))?;

    let (_, outcome) = stack.next_outcome().await?;

    ensure!(outcome == TaskOutcome::Expired);
    ensure!(stack.client.call_count() == 0);
    ensure!(
        stack.service.submit_raw_decision(task_id, "alice", "approve")
            == Err(DecisionError::NoPendingApproval(task_id))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn publish_failure_is_reported_and_keeps_the_branch(mut stack: Stack) -> eyre::Result<()> {
    stack.client.fail_open_with(ChangeRequestError::Rejected {
        status: 403,
        message: "Resource not accessible by integration".to_owned(),
    });
    let task_id = stack.service.submit_task(fix_request("alice", "fix typo"))?;

    stack.decide_when_ready(task_id, "alice", "approve").await?;
    let (_, outcome) = stack.next_outcome().await?;

    let Some(reason) = outcome.failure_reason() else {
        bail!("expected a failure, got {outcome}");
    };
    ensure!(reason.contains("Resource not accessible by integration"));
    ensure!(stack.client.deleted().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn late_decision_after_resolution_is_ignored(mut stack: Stack) -> eyre::Result<()> {
    let task_id = stack.service.submit_task(fix_request("alice", "add a test"))?;
    stack.decide_when_ready(task_id, "alice", "approve").await?;
    stack.next_outcome().await?;

    let late = stack.service.submit_raw_decision(task_id, "alice", "reject");

    ensure!(late == Err(DecisionError::NoPendingApproval(task_id)));
    ensure!(stack.client.deleted().is_empty());
    ensure!(stack.outcomes.try_recv().is_err());
    Ok(())
}
