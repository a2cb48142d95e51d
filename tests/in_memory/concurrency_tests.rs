//! Independent tasks running side by side.

use super::helpers::{Stack, fix_request, stack};
use eyre::ensure;
use ghost_coder::task::{
    domain::{ApprovalDecision, TaskOutcome},
    services::DecisionError,
};
use rstest::rstest;
use std::collections::HashMap;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn decisions_reach_only_their_own_task(mut stack: Stack) -> eyre::Result<()> {
    let alice_task = stack.service.submit_task(fix_request("alice", "fix a"))?;
    let bob_task = stack.service.submit_task(fix_request("bob", "fix b"))?;

    let cross = stack.decide_when_ready(alice_task, "bob", "approve").await;
    ensure!(matches!(cross, Err(DecisionError::Approval(_))));

    stack.decide_when_ready(alice_task, "alice", "approve").await?;
    stack.decide_when_ready(bob_task, "bob", "reject").await?;

    let mut outcomes = HashMap::new();
    for _ in 0..2 {
        let (task_id, outcome) = stack.next_outcome().await?;
        ensure!(outcomes.insert(task_id, outcome).is_none(), "duplicate outcome");
    }

    ensure!(outcomes.get(&alice_task).and_then(TaskOutcome::url).is_some());
    ensure!(outcomes.get(&bob_task) == Some(&TaskOutcome::BranchDiscarded));
    ensure!(stack.client.opened().len() == 1);
    ensure!(stack.client.deleted().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn every_task_gets_a_distinct_branch_and_one_outcome(mut stack: Stack) -> eyre::Result<()> {
    let mut submitted = Vec::new();
    for index in 0..8 {
        submitted.push(
            stack
                .service
                .submit_task(fix_request("alice", &format!("fix number {index}")))?,
        );
    }
    for task_id in &submitted {
        let decision = stack.decide_when_ready(*task_id, "alice", "approve").await?;
        ensure!(decision == ApprovalDecision::Approved);
    }

    let mut outcomes = HashMap::new();
    for _ in 0..submitted.len() {
        let (task_id, outcome) = stack.next_outcome().await?;
        ensure!(outcomes.insert(task_id, outcome).is_none(), "duplicate outcome");
    }
    ensure!(submitted.iter().all(|task_id| outcomes.contains_key(task_id)));

    let mut branches: Vec<String> = stack
        .launcher
        .launched()
        .iter()
        .map(|spec| spec.branch_name.to_string())
        .collect();
    branches.sort();
    branches.dedup();
    ensure!(branches.len() == submitted.len());
    Ok(())
}
