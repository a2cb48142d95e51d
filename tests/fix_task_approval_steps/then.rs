//! Then steps for fix-task approval BDD scenarios.

use super::world::{FixTaskWorld, run_async};
use ghost_coder::task::services::{ApprovalError, DecisionError};
use rstest_bdd_macros::then;
use std::time::Duration;

#[then(r#"the task outcome is "{expected}""#)]
fn task_outcome_is(world: &mut FixTaskWorld, expected: String) -> Result<(), eyre::Report> {
    let task_id = world
        .task_id
        .ok_or_else(|| eyre::eyre!("missing task id in scenario world"))?;
    let outcomes = world
        .outcomes
        .as_mut()
        .ok_or_else(|| eyre::eyre!("task has not been submitted"))?;

    let (reported, outcome) =
        run_async(tokio::time::timeout(Duration::from_secs(5), outcomes.recv()))?
            .ok_or_else(|| eyre::eyre!("outcome channel closed"))?;
    if reported != task_id {
        return Err(eyre::eyre!("outcome reported for unexpected task {reported}"));
    }

    let value = serde_json::to_value(&outcome)?;
    let tag = value
        .get("outcome")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| eyre::eyre!("outcome has no tag: {value}"))?;
    if tag != expected {
        return Err(eyre::eyre!("expected outcome {expected}, got {outcome}"));
    }
    Ok(())
}

#[then("one pull request was opened from the task branch")]
fn one_pull_request_opened(world: &FixTaskWorld) -> Result<(), eyre::Report> {
    let launched = world.launcher.launched();
    let opened = world.client.opened();
    let ([spec], [request]) = (launched.as_slice(), opened.as_slice()) else {
        return Err(eyre::eyre!(
            "expected one launch and one pull request, got {} and {}",
            launched.len(),
            opened.len()
        ));
    };
    if request.head != spec.branch_name {
        return Err(eyre::eyre!(
            "pull request head {} does not match pushed branch {}",
            request.head,
            spec.branch_name
        ));
    }
    Ok(())
}

#[then("the task branch was deleted")]
fn task_branch_deleted(world: &FixTaskWorld) -> Result<(), eyre::Report> {
    let launched = world.launcher.launched();
    let deleted = world.client.deleted();
    let ([spec], [deletion]) = (launched.as_slice(), deleted.as_slice()) else {
        return Err(eyre::eyre!(
            "expected one launch and one deletion, got {} and {}",
            launched.len(),
            deleted.len()
        ));
    };
    if deletion.branch != spec.branch_name {
        return Err(eyre::eyre!("deleted {} instead of {}", deletion.branch, spec.branch_name));
    }
    Ok(())
}

#[then("the source host was not contacted")]
fn source_host_not_contacted(world: &FixTaskWorld) -> Result<(), eyre::Report> {
    let calls = world.client.call_count();
    if calls != 0 {
        return Err(eyre::eyre!("expected no source host calls, got {calls}"));
    }
    Ok(())
}

#[then("the decision is refused as unauthorized")]
fn decision_refused_as_unauthorized(world: &FixTaskWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_decision
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no decision was submitted"))?;
    if !matches!(
        result,
        Err(DecisionError::Approval(ApprovalError::Unauthorized(_)))
    ) {
        return Err(eyre::eyre!("expected an unauthorized refusal, got {result:?}"));
    }
    Ok(())
}

#[then("the requester was offered a review link for the task branch")]
fn review_link_offered(world: &FixTaskWorld) -> Result<(), eyre::Report> {
    let launched = world.launcher.launched();
    let [spec] = launched.as_slice() else {
        return Err(eyre::eyre!("expected one launch, got {}", launched.len()));
    };
    let expected = format!(
        "https://stackblitz.com/github/acme/widgets/tree/{}",
        spec.branch_name
    );
    if world.review_url.as_deref() != Some(expected.as_str()) {
        return Err(eyre::eyre!(
            "expected review link {expected}, got {:?}",
            world.review_url
        ));
    }
    Ok(())
}
