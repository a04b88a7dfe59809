// SPDX-License-Identifier: MIT

//! Signal handler behavior: completions, approvals, custom events,
//! artifact indexing.

use super::*;
use muster_core::{ArtifactEntry, EngineDecision};

#[test]
fn hello_flow_completes_goal() {
    let mut engine = hello_engine();
    assert_eq!(engine.status(), EngineStatus::Running);
    assert_eq!(engine.current_state().step("g1-step").unwrap().status, StepStatus::Waiting);

    send_ok(&mut engine, "g1-step", T0 + 10);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Completed);
    assert_eq!(state.step("g1-step").unwrap().status, StepStatus::Done);
    assert_invariants(&state);
}

#[yare::parameterized(
    ok      = { ResponseStatus::Ok, StepStatus::Done },
    partial = { ResponseStatus::Partial, StepStatus::InProgress },
    fail    = { ResponseStatus::Fail, StepStatus::Failed },
)]
fn response_status_maps_to_step_status(status: ResponseStatus, expected: StepStatus) {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::AgentCompleted { step_id: "W-1".into(), response: response("W-1", status) },
        T0 + 5,
    );

    let state = engine.current_state();
    assert_eq!(state.step("W-1").unwrap().status, expected);
    assert_eq!(state.step("W-1").unwrap().updated_at_ms, T0 + 5);
    assert_eq!(state.status, EngineStatus::Running);
}

#[test]
fn completion_for_unknown_step_upserts_it() {
    let mut engine = idle_engine("W", "W-1");
    send_ok(&mut engine, "ghost-1", T0 + 5);

    let state = engine.current_state();
    let ghost = state.step("ghost-1").unwrap();
    assert_eq!(ghost.kind, muster_core::UNKNOWN_KIND);
    assert_eq!(ghost.status, StepStatus::Done);
    assert_eq!(ghost.requested_at_ms, T0 + 5);
    assert_invariants(&state);
}

#[test]
fn duplicate_completion_is_idempotent_on_step_state() {
    let mut engine = idle_engine("W", "W-1");
    send_ok(&mut engine, "W-1", T0 + 5);
    let first = engine.current_state();

    send_ok(&mut engine, "W-1", T0 + 5);
    let second = engine.current_state();

    assert_eq!(first.step("W-1"), second.step("W-1"));
    assert_eq!(first.artifacts, second.artifacts);
    assert_eq!(first.status, second.status);
}

#[test]
fn artifacts_with_ref_index_under_stable_keys() {
    let mut engine = idle_engine("X", "X-1");
    let resp = ok_response("X-1")
        .artifact(ArtifactEntry::new("FILE").ref_id("readme").url("file:///README.md"));
    engine.handle_signal(
        &EngineSignal::AgentCompleted { step_id: "X-1".into(), response: resp.clone() },
        T0 + 1,
    );

    let state = engine.current_state();
    let entry = state.artifacts.get("FILE:readme").unwrap();
    assert_eq!(entry["type"], "FILE");
    assert_eq!(entry["url"], "file:///README.md");

    // Same response again: same key, same value (last-writer-wins)
    engine.handle_signal(
        &EngineSignal::AgentCompleted { step_id: "X-1".into(), response: resp },
        T0 + 2,
    );
    assert_eq!(engine.current_state().artifacts.len(), 1);
}

#[test]
fn artifacts_without_ref_get_fresh_deterministic_keys() {
    let mut engine = idle_engine("X", "X-1");
    let resp = ok_response("X-1")
        .artifact(ArtifactEntry::new("LOG"))
        .artifact(ArtifactEntry::new("LOG"));
    engine.handle_signal(
        &EngineSignal::AgentCompleted { step_id: "X-1".into(), response: resp },
        T0 + 1,
    );

    let state = engine.current_state();
    let log_keys: Vec<_> =
        state.artifacts.keys().filter(|k| k.starts_with("LOG:")).collect();
    assert_eq!(log_keys.len(), 2, "each missing ref draws a fresh uuid");
}

#[test]
fn approve_marks_done_and_clears_gate() {
    let mut engine = start_with(StubSpec::new("gate", |_, _, _| {
        Ok(EngineDecision::new("gate").action(muster_core::EngineAction::request_approval_as("ap1")))
    }));
    engine.boot(&boot_work("W", "W-1"), T0);
    send_ok(&mut engine, "W-1", T0 + 1);
    assert_eq!(engine.status(), EngineStatus::AwaitingApproval);

    engine.handle_signal(&EngineSignal::Approve { step_id: "ap1".into() }, T0 + 2);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Running);
    assert_eq!(state.step("ap1").unwrap().status, StepStatus::Done);
    assert_invariants(&state);
}

#[test]
fn gate_holds_until_last_approval_is_granted() {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("gates")
                .action(muster_core::EngineAction::request_approval_as("ap1"))
                .action(muster_core::EngineAction::request_approval_as("ap2")),
        },
        T0 + 1,
    );
    assert_eq!(engine.status(), EngineStatus::AwaitingApproval);

    engine.handle_signal(&EngineSignal::Approve { step_id: "ap1".into() }, T0 + 2);
    assert_eq!(engine.status(), EngineStatus::AwaitingApproval);

    engine.handle_signal(&EngineSignal::Approve { step_id: "ap2".into() }, T0 + 3);
    assert_eq!(engine.status(), EngineStatus::Running);
}

#[test]
fn approve_for_missing_step_is_a_noop() {
    let mut engine = idle_engine("W", "W-1");
    let before = engine.current_state();
    engine.handle_signal(&EngineSignal::Approve { step_id: "nope".into() }, T0 + 1);
    let after = engine.current_state();
    assert_eq!(before, after);
}

#[test]
fn agent_completion_can_settle_an_approval_step() {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("gate")
                .action(muster_core::EngineAction::request_approval_as("ap1")),
        },
        T0 + 1,
    );
    assert_eq!(engine.status(), EngineStatus::AwaitingApproval);

    send_ok(&mut engine, "ap1", T0 + 2);
    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Running);
    assert_invariants(&state);
}

#[test]
fn custom_event_routes_to_spec_decision() {
    let spec = StubSpec::new("custom", |_, _, _| Ok(EngineDecision::new("noop")))
        .with_custom(|_, event_type, _| {
            if event_type == "custom:finish" {
                Ok(Some(EngineDecision::finish("done")))
            } else {
                Ok(None)
            }
        });
    let mut engine = start_with(spec);
    engine.boot(&boot_work("W", "W-1"), T0);

    engine.handle_signal(
        &EngineSignal::Custom { event_type: "custom:other".into(), payload: Value::Null },
        T0 + 1,
    );
    assert_eq!(engine.status(), EngineStatus::Running);

    engine.handle_signal(
        &EngineSignal::Custom { event_type: "custom:finish".into(), payload: json!({"by": "op"}) },
        T0 + 2,
    );
    assert_eq!(engine.status(), EngineStatus::Completed);
}

#[test]
fn time_watermark_never_regresses() {
    let mut engine = idle_engine("W", "W-1");
    send_ok(&mut engine, "W-1", T0 + 100);
    // A stale stamp arrives late; the step keeps its later update time
    engine.handle_signal(
        &EngineSignal::AgentCompleted {
            step_id: "W-1".into(),
            response: response("W-1", ResponseStatus::Partial),
        },
        T0 + 50,
    );

    let state = engine.current_state();
    assert_eq!(state.step("W-1").unwrap().updated_at_ms, T0 + 100);
    assert_invariants(&state);
}

#[test]
fn spec_sees_updated_step_before_deciding() {
    let spec = StubSpec::new("inspect", |state, response, _| {
        let step = state
            .step(response.step_id.as_str())
            .ok_or_else(|| crate::SpecError::new("step missing"))?;
        if step.status != StepStatus::Done {
            return Err(crate::SpecError::new("step not yet updated"));
        }
        Ok(EngineDecision::finish("ok"))
    });
    let mut engine = start_with(spec);
    engine.boot(&boot_work("W", "W-1"), T0);
    send_ok(&mut engine, "W-1", T0 + 1);
    assert_eq!(engine.status(), EngineStatus::Completed);
}
