// SPDX-License-Identifier: MIT

//! Terminal transitions: cancellation and invalid actions.

use super::prelude::*;
use muster_core::test_support::ok_response;

fn idle_policy(
    _state: &EngineState,
    _response: &AgentResponse,
    _ctx: &mut ExecContext<'_>,
) -> Result<EngineDecision, SpecError> {
    Ok(EngineDecision::new("idle"))
}

fn idle_harness() -> Harness {
    Harness::new(
        Coordinator::builder()
            .register_spec(policy("idle", idle_policy))
            .register_agent(ok_agent("worker"))
            .route("Y", "worker"),
    )
}

#[tokio::test]
async fn cancel_before_any_completion_sticks() {
    let harness = idle_harness();
    let handle =
        harness.start(StartGoal::new("cancel-1", "idle").boot_decision(boot("Y", "Y-1")));

    handle.cancel("user").await.unwrap();
    handle.drained().await;
    assert_eq!(handle.status(), EngineStatus::Cancelled);
    let log_len = handle.current_state().log.len();

    // A late completion is observed but mutates nothing.
    handle.agent_completed("Y-1", ok_response("Y-1")).await.unwrap();
    handle.drained().await;

    let state = handle.current_state();
    assert_eq!(state.status, EngineStatus::Cancelled);
    assert_eq!(
        state.step("Y-1").map(|s| s.status),
        Some(StepStatus::Waiting),
        "the step was never marked DONE"
    );
    assert_eq!(state.log.len(), log_len + 1);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("SIGNAL_IGNORED"));
}

#[tokio::test]
async fn cancel_while_awaiting_approval_cancels_directly() {
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

    let harness = Harness::new(
        Coordinator::builder()
            .register_spec(policy("gated", gate_policy))
            .register_agent(ok_agent("worker"))
            .route("W", "worker"),
    );
    let handle =
        harness.start(StartGoal::new("cancel-2", "gated").boot_decision(boot("W", "W-1")));

    harness.dispatcher.tick(&handle).await;
    handle.drained().await;
    assert_eq!(handle.status(), EngineStatus::AwaitingApproval);

    handle.cancel("operator").await.unwrap();
    handle.drained().await;
    assert_eq!(handle.status(), EngineStatus::Cancelled);
}

#[tokio::test]
async fn unsupported_action_tag_fails_the_goal() {
    let harness = idle_harness();
    let handle =
        harness.start(StartGoal::new("invalid-1", "idle").boot_decision(boot("Y", "Y-1")));

    // An externally-supplied decision with an action tag outside the
    // closed set, as a raw wire payload.
    let decision: EngineDecision = serde_json::from_value(serde_json::json!({
        "decision_id": "bad-actor",
        "actions": [{"type": "REQUEST_UNSUPPORTED", "work_kind": "Z"}],
    }))
    .unwrap();

    handle.apply_decision(decision).await.unwrap();
    handle.drained().await;

    let state = handle.current_state();
    assert_eq!(state.status, EngineStatus::Failed);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("APPLICATION_ERROR"));
}

#[tokio::test]
async fn unknown_spec_name_yields_queryable_failed_goal() {
    let harness = idle_harness();
    let handle = harness.start(StartGoal::new("ghost-1", "no-such-spec"));

    let state = handle.current_state();
    assert_eq!(state.status, EngineStatus::Failed);
    assert!(matches!(
        state.last_event(),
        Some(EngineEvent::UnknownSpec { spec }) if spec == "no-such-spec"
    ));
}
