// SPDX-License-Identifier: MIT

//! Human approval gates: AWAITING_APPROVAL in, approve out.

use super::prelude::*;

fn gate_policy(
    _state: &EngineState,
    response: &AgentResponse,
    _ctx: &mut ExecContext<'_>,
) -> Result<EngineDecision, SpecError> {
    if response.is_ok() {
        Ok(EngineDecision::new("gate").action(EngineAction::request_approval_as("ap1")))
    } else {
        Ok(EngineDecision::new("hold"))
    }
}

fn gate_cleared(
    _state: &EngineState,
    event_type: &str,
    _payload: &serde_json::Value,
) -> Result<Option<EngineDecision>, SpecError> {
    if event_type == "gate:cleared" {
        Ok(Some(EngineDecision::finish("cleared")))
    } else {
        Ok(None)
    }
}

fn gated_harness() -> Harness {
    Harness::new(
        Coordinator::builder()
            .register_spec(policy_with_custom("gated", gate_policy, gate_cleared))
            .register_agent(ok_agent("worker"))
            .route("W", "worker"),
    )
}

#[tokio::test]
async fn approval_gate_round_trip() {
    let harness = gated_harness();
    let handle =
        harness.start(StartGoal::new("gated-1", "gated").boot_decision(boot("W", "W-1")));

    // Work completes; the spec gates the goal.
    harness.dispatcher.tick(&handle).await;
    handle.drained().await;
    assert_eq!(handle.status(), EngineStatus::AwaitingApproval);

    // The approval step is not routed to any agent: it stays WAITING
    // under the dispatcher.
    let summary = harness.dispatcher.tick(&handle).await;
    assert_eq!(summary.dispatched, 0);
    assert_eq!(summary.unroutable, 1);

    // Grant the approval: back to RUNNING.
    harness.clock.advance(Duration::from_millis(5));
    handle.approve("ap1").await.unwrap();
    handle.drained().await;
    assert_eq!(handle.status(), EngineStatus::Running);
    assert_eq!(
        handle.current_state().step("ap1").map(|s| s.status),
        Some(StepStatus::Done)
    );

    // The spec finishes on its custom event.
    handle.custom("gate:cleared", serde_json::Value::Null).await.unwrap();
    handle.drained().await;
    assert_eq!(handle.status(), EngineStatus::Completed);
}

#[tokio::test]
async fn unrelated_custom_events_are_ignored() {
    let harness = gated_harness();
    let handle =
        harness.start(StartGoal::new("gated-2", "gated").boot_decision(boot("W", "W-1")));

    handle.custom("gate:unknown", serde_json::json!({"x": 1})).await.unwrap();
    handle.drained().await;

    let state = handle.current_state();
    assert_eq!(state.status, EngineStatus::Running);
    assert!(matches!(
        state.last_event(),
        Some(EngineEvent::CustomEvent { event_type }) if event_type == "gate:unknown"
    ));
}

#[tokio::test]
async fn approving_a_missing_step_changes_nothing() {
    let harness = gated_harness();
    let handle =
        harness.start(StartGoal::new("gated-3", "gated").boot_decision(boot("W", "W-1")));

    let before = handle.current_state();
    handle.approve("no-such-step").await.unwrap();
    handle.drained().await;
    similar_asserts::assert_eq!(before, handle.current_state());
}
