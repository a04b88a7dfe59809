// SPDX-License-Identifier: MIT

//! Durability: shutdown, resume, and mid-goal continuation.

use super::prelude::*;

fn two_phase_policy(
    _state: &EngineState,
    response: &AgentResponse,
    _ctx: &mut ExecContext<'_>,
) -> Result<EngineDecision, SpecError> {
    if !response.is_ok() {
        return Ok(EngineDecision::new("hold"));
    }
    if response.step_id.as_str().starts_with("A-") {
        return Ok(EngineDecision::new("phase-b")
            .action(EngineAction::request_work_as("B", "B-1")));
    }
    if response.step_id.as_str().starts_with("B-") {
        return Ok(EngineDecision::finish("done"));
    }
    Ok(EngineDecision::new("hold"))
}

fn two_phase_builder() -> CoordinatorBuilder {
    Coordinator::builder()
        .register_spec(policy("two-phase", two_phase_policy))
        .register_agent(ok_agent("worker"))
        .route("A", "worker")
        .route("B", "worker")
}

#[tokio::test]
async fn goal_survives_host_restart_mid_flight() {
    let harness = Harness::new(two_phase_builder());
    let handle =
        harness.start(StartGoal::new("restart-1", "two-phase").boot_decision(boot("A", "A-1")));

    // Finish phase A only.
    harness.dispatcher.tick(&handle).await;
    handle.drained().await;
    let parked = handle.current_state();
    assert_eq!(parked.step("B-1").map(|s| s.status), Some(StepStatus::Waiting));

    // Stop the host, then bring the goal back.
    handle.shutdown();
    handle.join().await;

    let spec = harness
        .coordinator
        .resolve_spec("two-phase", &GoalId::new("restart-1"))
        .expect("registered spec");
    let resumed = harness.runtime.resume(&GoalId::new("restart-1"), spec).unwrap();
    similar_asserts::assert_eq!(resumed.current_state(), parked);

    // The dispatcher picks up where it left off.
    let status = harness.dispatcher.run(&resumed).await;
    assert_eq!(status, EngineStatus::Completed);
    assert_eq!(
        resumed.current_state().step("B-1").map(|s| s.status),
        Some(StepStatus::Done)
    );
}

#[tokio::test]
async fn restart_preserves_log_and_artifacts() {
    let harness = Harness::new(two_phase_builder());
    let handle = harness
        .start(StartGoal::new("restart-2", "two-phase").boot_decision(boot("A", "A-1")));

    handle
        .apply_decision(
            EngineDecision::new("mark").action(EngineAction::annotate("phase", "one")),
        )
        .await
        .unwrap();
    handle.drained().await;
    let before = handle.current_state();

    handle.shutdown();
    handle.join().await;

    let spec = harness
        .coordinator
        .resolve_spec("two-phase", &GoalId::new("restart-2"))
        .expect("registered spec");
    let resumed = harness.runtime.resume(&GoalId::new("restart-2"), spec).unwrap();

    let after = resumed.current_state();
    similar_asserts::assert_eq!(after, before);
    assert_eq!(after.artifacts.get("phase"), Some(&serde_json::json!("one")));
}

#[tokio::test]
async fn completed_goal_resumes_as_completed() {
    let harness = Harness::new(two_phase_builder());
    let handle = harness
        .start(StartGoal::new("restart-3", "two-phase").boot_decision(boot("A", "A-1")));

    let status = harness.dispatcher.run(&handle).await;
    assert_eq!(status, EngineStatus::Completed);
    let finished = handle.current_state();

    handle.shutdown();
    handle.join().await;

    let spec = harness
        .coordinator
        .resolve_spec("two-phase", &GoalId::new("restart-3"))
        .expect("registered spec");
    let resumed = harness.runtime.resume(&GoalId::new("restart-3"), spec).unwrap();
    assert_eq!(resumed.status(), EngineStatus::Completed);
    similar_asserts::assert_eq!(resumed.current_state(), finished);
}
