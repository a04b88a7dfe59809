// SPDX-License-Identifier: MIT

//! Decision application: action ordering, idempotent re-requests,
//! finalize, invalid actions, postApply.

use super::*;
use muster_core::{EngineAction, EngineDecision};

#[test]
fn annotate_writes_and_overwrites_artifacts() {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("d1")
                .action(EngineAction::annotate("note", "first"))
                .action(EngineAction::annotate("note", "second")),
        },
        T0 + 1,
    );

    assert_eq!(engine.current_state().artifacts.get("note"), Some(&json!("second")));
}

#[test]
fn request_work_without_id_mints_kind_prefixed_step() {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("d1").action(EngineAction::request_work("BUILD")),
        },
        T0 + 1,
    );

    let state = engine.current_state();
    let (id, step) = state
        .open_steps
        .iter()
        .find(|(id, _)| id.as_str().starts_with("BUILD-"))
        .unwrap();
    assert!(id.as_str().len() > "BUILD-".len());
    assert_eq!(step.status, StepStatus::Waiting);
    assert_eq!(step.kind, "BUILD");
}

#[test]
fn identical_engines_mint_identical_step_ids() {
    let run = || {
        let mut engine = idle_engine("W", "W-1");
        engine.handle_signal(
            &EngineSignal::ApplyDecision {
                decision: EngineDecision::new("d1").action(EngineAction::request_work("BUILD")),
            },
            T0 + 1,
        );
        engine.current_state()
    };
    assert_eq!(run(), run());
}

#[test]
fn rerequesting_done_step_is_ignored_with_warning() {
    let mut engine = idle_engine("W", "W-1");
    send_ok(&mut engine, "W-1", T0 + 1);
    let done_step = engine.current_state().step("W-1").cloned().unwrap();

    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("retry")
                .action(EngineAction::request_work_as("W", "W-1").payload(json!({"retry": true}))),
        },
        T0 + 2,
    );

    let state = engine.current_state();
    assert_eq!(state.step("W-1"), Some(&done_step), "DONE steps are immutable");
    assert!(event_kinds(&engine).contains(&"REQUEST_IGNORED"));
    assert_eq!(state.status, EngineStatus::Running);
}

#[test]
fn rerequesting_failed_step_resets_it() {
    let mut engine = idle_engine("W", "W-1");
    send_fail(&mut engine, "W-1", T0 + 1);
    assert_eq!(engine.current_state().step("W-1").unwrap().status, StepStatus::Failed);

    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("retry")
                .action(EngineAction::request_work_as("W", "W-1").payload(json!({"attempt": 2}))),
        },
        T0 + 2,
    );

    let state = engine.current_state();
    let step = state.step("W-1").unwrap();
    assert_eq!(step.status, StepStatus::Waiting);
    assert_eq!(step.payload, json!({"attempt": 2}));
    assert_eq!(step.requested_at_ms, T0, "reset keeps the original request time");
    assert_eq!(step.updated_at_ms, T0 + 2);
    assert_invariants(&state);
}

#[test]
fn rerequesting_waiting_step_overwrites_payload() {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("replace")
                .action(EngineAction::request_work_as("W", "W-1").payload(json!({"v": 2}))),
        },
        T0 + 1,
    );

    let step = engine.current_state().step("W-1").cloned().unwrap();
    assert_eq!(step.status, StepStatus::Waiting);
    assert_eq!(step.payload, json!({"v": 2}));
}

#[test]
fn unsupported_action_fails_goal_and_keeps_applied_prefix() {
    let mut engine = idle_engine("W", "W-1");
    let decision: EngineDecision = serde_json::from_value(json!({
        "decision_id": "bad",
        "actions": [
            {"type": "ANNOTATE", "key": "ran", "value": true},
            {"type": "REQUEST_UNSUPPORTED", "weird": 1},
            {"type": "ANNOTATE", "key": "never", "value": true},
        ],
    }))
    .unwrap();

    engine.handle_signal(&EngineSignal::ApplyDecision { decision }, T0 + 1);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Failed);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("APPLICATION_ERROR"));
    assert_eq!(state.artifacts.get("ran"), Some(&json!(true)), "applied prefix remains");
    assert!(!state.artifacts.contains_key("never"), "application aborted at the bad action");
}

#[test]
fn finalize_with_no_actions_completes_goal() {
    let mut engine = idle_engine("W", "W-1");
    let steps_before = engine.current_state().open_steps.clone();

    engine.handle_signal(
        &EngineSignal::ApplyDecision { decision: EngineDecision::finish("wrap") },
        T0 + 1,
    );

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Completed);
    assert_eq!(state.open_steps, steps_before);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("FINALIZED"));
}

#[test]
fn finalize_may_also_open_a_step() {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("last")
                .action(EngineAction::request_work_as("CLEANUP", "CLEANUP-1"))
                .finalize(),
        },
        T0 + 1,
    );

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Completed);
    assert_eq!(state.step("CLEANUP-1").unwrap().status, StepStatus::Waiting);
}

#[test]
fn request_approval_gates_the_goal() {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("gate").action(EngineAction::request_approval()),
        },
        T0 + 1,
    );

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::AwaitingApproval);
    assert!(state.has_waiting_approval());
    assert_invariants(&state);
}

#[test]
fn ignored_approval_rerequest_does_not_gate() {
    let mut engine = idle_engine("W", "W-1");
    // Open and settle an approval step
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("gate").action(EngineAction::request_approval_as("ap1")),
        },
        T0 + 1,
    );
    engine.handle_signal(&EngineSignal::Approve { step_id: "ap1".into() }, T0 + 2);
    assert_eq!(engine.status(), EngineStatus::Running);

    // Re-request against the now-DONE approval step: ignored, no gate
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("gate2").action(EngineAction::request_approval_as("ap1")),
        },
        T0 + 3,
    );
    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Running);
    assert!(event_kinds(&engine).contains(&"REQUEST_IGNORED"));
    assert_invariants(&state);
}

#[test]
fn post_apply_runs_after_every_decision() {
    let spec = StubSpec::new("normalize", |_, _, _| Ok(EngineDecision::new("noop")))
        .with_post_apply(|view| {
            let count = view.open_steps().len();
            view.set_artifact("normalize:step_count", count);
            Ok(())
        });
    let mut engine = start_with(spec);
    engine.boot(&boot_work("W", "W-1"), T0);

    assert_eq!(
        engine.current_state().artifacts.get("normalize:step_count"),
        Some(&json!(1))
    );
}

#[test]
fn post_apply_error_fails_goal() {
    let spec = StubSpec::new("fragile", |_, _, _| Ok(EngineDecision::new("noop")))
        .with_post_apply(|_| Err(crate::SpecError::new("normalization exploded")));
    let mut engine = start_with(spec);
    engine.boot(&boot_work("W", "W-1"), T0);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Failed);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("SPEC_ERROR"));
}

#[test]
fn spec_error_on_completion_fails_goal_and_freezes_state() {
    let mut engine = start_with(StubSpec::new("throws", |_, _, _| {
        Err(crate::SpecError::new("policy bug"))
    }));
    engine.boot(&boot_work("W", "W-1"), T0);
    send_ok(&mut engine, "W-1", T0 + 1);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Failed);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("SPEC_ERROR"));

    // Later signals are observed but change nothing
    let steps = state.open_steps.clone();
    send_ok(&mut engine, "W-1", T0 + 2);
    let after = engine.current_state();
    assert_eq!(after.open_steps, steps);
    assert_eq!(after.last_event().map(|e| e.kind()), Some("SIGNAL_IGNORED"));
}

#[test]
fn identical_decision_applied_twice_is_idempotent() {
    // At-least-once delivery: a decision whose work requests carry
    // explicit step IDs replays without effect.
    let decision = EngineDecision::new("idem")
        .action(EngineAction::request_work_as("W", "W-2").payload(json!({"n": 1})))
        .action(EngineAction::annotate("note", "same"));

    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(&EngineSignal::ApplyDecision { decision: decision.clone() }, T0 + 1);
    let first = engine.current_state();

    engine.handle_signal(&EngineSignal::ApplyDecision { decision }, T0 + 1);
    let second = engine.current_state();

    assert_eq!(first.open_steps, second.open_steps);
    assert_eq!(first.artifacts, second.artifacts);
    assert_eq!(first.status, second.status);
}

#[test]
fn compact_log_keeps_tail_only() {
    let mut engine = idle_engine("W", "W-1");
    for i in 0..10 {
        engine.handle_signal(
            &EngineSignal::ApplyDecision {
                decision: EngineDecision::new(format!("d{i}"))
                    .action(EngineAction::annotate("k", i)),
            },
            T0 + i,
        );
    }
    let full_len = engine.current_state().log.len();
    assert!(full_len > 4);

    let tail: Vec<_> = engine.current_state().log[full_len - 4..].to_vec();
    engine.compact_log(4);

    let state = engine.current_state();
    assert_eq!(state.log.len(), 4);
    assert_eq!(state.log, tail);
    assert_eq!(state.artifacts.get("k"), Some(&json!(9)), "artifacts survive compaction");
}
