// SPDX-License-Identifier: MIT

use super::*;
use crate::error::RuntimeError;
use muster_core::test_support::{boot_work, ok_response};
use muster_core::{EngineStatus, FakeClock, StepStatus};
use muster_engine::test_support::StubSpec;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    runtime: Runtime<FakeClock>,
    clock: FakeClock,
}

fn fixture() -> Fixture {
    fixture_with(|c| c)
}

fn fixture_with(tune: impl FnOnce(RuntimeConfig) -> RuntimeConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let config = tune(RuntimeConfig::new(dir.path()));
    let clock = FakeClock::new();
    Fixture { _dir: dir, runtime: Runtime::with_clock(config, clock.clone()), clock }
}

fn hello_spec() -> Arc<dyn Spec> {
    Arc::new(StubSpec::finalizing("hello"))
}

fn idle_spec() -> Arc<dyn Spec> {
    Arc::new(StubSpec::new("idle", |_, _, _| Ok(EngineDecision::new("idle"))))
}

#[tokio::test]
async fn start_boot_signal_complete() {
    let fx = fixture();
    let handle = fx
        .runtime
        .start(GoalId::new("g1"), hello_spec(), Some(boot_work("GREET", "g1-step")))
        .unwrap();

    assert_eq!(handle.status(), EngineStatus::Running);
    assert_eq!(
        handle.current_state().step("g1-step").map(|s| s.status),
        Some(StepStatus::Waiting)
    );

    handle.agent_completed("g1-step", ok_response("g1-step")).await.unwrap();
    assert_eq!(handle.await_terminal().await, EngineStatus::Completed);
    assert_eq!(
        handle.current_state().step("g1-step").map(|s| s.status),
        Some(StepStatus::Done)
    );
}

#[tokio::test]
async fn signals_are_stamped_with_host_clock() {
    let fx = fixture();
    let handle = fx
        .runtime
        .start(GoalId::new("g1"), idle_spec(), Some(boot_work("W", "W-1")))
        .unwrap();

    fx.clock.advance(Duration::from_millis(500));
    handle.agent_completed("W-1", ok_response("W-1")).await.unwrap();
    handle.drained().await;

    let step = handle.current_state().step("W-1").cloned().unwrap();
    assert_eq!(step.updated_at_ms, step.requested_at_ms + 500);
}

#[tokio::test]
async fn starting_an_existing_goal_fails() {
    let fx = fixture();
    let _handle = fx.runtime.start(GoalId::new("g1"), idle_spec(), None).unwrap();
    let second = fx.runtime.start(GoalId::new("g1"), idle_spec(), None);
    assert!(matches!(second, Err(RuntimeError::GoalExists(_))));
}

#[tokio::test]
async fn resume_unknown_goal_fails() {
    let fx = fixture();
    let result = fx.runtime.resume(&GoalId::new("ghost"), idle_spec());
    assert!(matches!(result, Err(RuntimeError::GoalNotFound(_))));
}

#[tokio::test]
async fn shutdown_then_resume_restores_state() {
    let fx = fixture();
    let goal = GoalId::new("g1");
    let handle =
        fx.runtime.start(goal.clone(), idle_spec(), Some(boot_work("W", "W-1"))).unwrap();

    fx.clock.advance(Duration::from_millis(10));
    handle.agent_completed("W-1", ok_response("W-1")).await.unwrap();
    handle.drained().await;
    let before = handle.current_state();

    handle.shutdown();
    handle.join().await;

    let resumed = fx.runtime.resume(&goal, idle_spec()).unwrap();
    assert_eq!(resumed.current_state(), before);
    assert_eq!(resumed.workflow_id(), handle.workflow_id());
}

#[tokio::test]
async fn resume_replays_wal_tail_without_snapshot() {
    // Large checkpoint interval: shutdown writes the only snapshot, so
    // kill the host instead to force pure WAL replay.
    let fx = fixture_with(|c| c.checkpoint_interval(1_000_000));
    let goal = GoalId::new("g1");
    let handle =
        fx.runtime.start(goal.clone(), idle_spec(), Some(boot_work("W", "W-1"))).unwrap();

    fx.clock.advance(Duration::from_millis(10));
    handle.agent_completed("W-1", ok_response("W-1")).await.unwrap();
    handle.drained().await;
    let before = handle.current_state();

    // Abandon the host without a final checkpoint (simulated crash):
    // drop every sender so the task exits, but the WAL was already
    // flushed before application.
    drop(handle);

    let resumed = fx.runtime.resume(&goal, idle_spec());
    // The old host may still hold the WAL open briefly; resumption
    // reads files only, so this is safe immediately.
    let resumed = resumed.unwrap();
    assert_eq!(resumed.current_state(), before);
}

#[tokio::test]
async fn checkpointing_truncates_wal_and_resume_agrees() {
    let fx = fixture_with(|c| c.checkpoint_interval(1));
    let goal = GoalId::new("g1");
    let handle =
        fx.runtime.start(goal.clone(), idle_spec(), Some(boot_work("W", "W-1"))).unwrap();

    for i in 0..5u8 {
        fx.clock.advance(Duration::from_millis(1));
        handle
            .apply_decision(
                EngineDecision::new(format!("d{i}"))
                    .action(muster_core::EngineAction::annotate(format!("k{i}"), i)),
            )
            .await
            .unwrap();
    }
    handle.drained().await;
    let before = handle.current_state();

    handle.shutdown();
    handle.join().await;

    assert!(fx.runtime.config().snapshot_path(&goal).exists());

    let resumed = fx.runtime.resume(&goal, idle_spec()).unwrap();
    assert_eq!(resumed.current_state(), before);
}

#[tokio::test]
async fn resume_with_wrong_spec_is_rejected() {
    let fx = fixture();
    let goal = GoalId::new("g1");
    let handle = fx.runtime.start(goal.clone(), idle_spec(), None).unwrap();
    handle.shutdown();
    handle.join().await;

    let result = fx.runtime.resume(&goal, hello_spec());
    assert!(matches!(result, Err(RuntimeError::SpecMismatch { .. })));
}

#[tokio::test]
async fn tombstone_goal_is_failed_and_resumable() {
    let fx = fixture();
    let goal = GoalId::new("g1");
    let handle = fx.runtime.start_failed(goal.clone(), "ghost-spec").unwrap();

    assert_eq!(handle.status(), EngineStatus::Failed);
    handle.agent_completed("W-1", ok_response("W-1")).await.unwrap();
    handle.drained().await;
    assert!(handle.current_state().open_steps.is_empty());

    handle.shutdown();
    handle.join().await;

    // Any spec may be offered to a tombstone; it is never invoked.
    let resumed = fx.runtime.resume(&goal, idle_spec()).unwrap();
    assert_eq!(resumed.status(), EngineStatus::Failed);
}

#[tokio::test]
async fn log_tail_bounds_state_log_at_checkpoint() {
    let fx = fixture_with(|c| c.checkpoint_interval(1).log_tail(3usize));
    let handle = fx
        .runtime
        .start(GoalId::new("g1"), idle_spec(), Some(boot_work("W", "W-1")))
        .unwrap();

    for i in 0..10u8 {
        handle
            .apply_decision(
                EngineDecision::new(format!("d{i}"))
                    .action(muster_core::EngineAction::annotate("k", i)),
            )
            .await
            .unwrap();
    }
    handle.drained().await;

    let state = handle.current_state();
    assert!(state.log.len() <= 5, "log tail stays bounded, was {}", state.log.len());
    assert_eq!(state.artifacts.get("k"), Some(&serde_json::json!(9)));
}

#[tokio::test]
async fn terminal_goal_still_accepts_and_logs_signals() {
    let fx = fixture();
    let handle = fx
        .runtime
        .start(GoalId::new("g1"), idle_spec(), Some(boot_work("Y", "Y-1")))
        .unwrap();

    handle.cancel("user").await.unwrap();
    handle.drained().await;
    assert_eq!(handle.status(), EngineStatus::Cancelled);

    handle.agent_completed("Y-1", ok_response("Y-1")).await.unwrap();
    handle.drained().await;

    let state = handle.current_state();
    assert_eq!(state.step("Y-1").map(|s| s.status), Some(StepStatus::Waiting));
    assert_eq!(state.last_event().map(|e| e.kind()), Some("SIGNAL_IGNORED"));
}
