//! Given steps for fix-task approval BDD scenarios.

use super::world::FixTaskWorld;
use ghost_coder::task::{adapters::memory::WorkerScript, ports::WorkerExit};
use rstest_bdd_macros::given;
use std::time::Duration;

#[given(r#"a fix request from "{requester}" for "{repository}""#)]
fn fix_request(world: &mut FixTaskWorld, requester: String, repository: String) {
    world.requester = Some(requester);
    world.repository = Some(repository);
}

#[given("the worker exits with code {code:i64}")]
fn worker_exits_with(world: &mut FixTaskWorld, code: i64) {
    world.script = WorkerScript::exit_with(
        ["cloning repository", "running agent"],
        WorkerExit::with_code(code),
    );
}

#[given("the approval window is {millis:u64} milliseconds")]
fn approval_window(world: &mut FixTaskWorld, millis: u64) {
    world.config = world
        .config
        .clone()
        .with_approval_timeout(Duration::from_millis(millis));
}
