// SPDX-License-Identifier: MIT

//! Terminal-state discipline: once COMPLETED/FAILED/CANCELLED, signals
//! append informational log entries only.

use super::*;
use muster_core::{EngineDecision, EngineSignal};

#[test]
fn cancel_transitions_and_records_reason() {
    let mut engine = idle_engine("Y", "Y-1");
    engine.handle_signal(&EngineSignal::Cancel { reason: "user".into() }, T0 + 1);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Cancelled);
    assert!(matches!(
        state.last_event(),
        Some(EngineEvent::Cancelled { reason }) if reason == "user"
    ));
}

#[test]
fn completion_after_cancel_logs_but_mutates_nothing() {
    let mut engine = idle_engine("Y", "Y-1");
    engine.handle_signal(&EngineSignal::Cancel { reason: "user".into() }, T0 + 1);
    let log_len = engine.current_state().log.len();

    send_ok(&mut engine, "Y-1", T0 + 2);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Cancelled);
    assert_eq!(
        state.step("Y-1").unwrap().status,
        StepStatus::Waiting,
        "terminal goals never mutate steps"
    );
    assert_eq!(state.log.len(), log_len + 1);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("SIGNAL_IGNORED"));
}

#[test]
fn cancel_is_idempotent() {
    let mut engine = idle_engine("Y", "Y-1");
    engine.handle_signal(&EngineSignal::Cancel { reason: "first".into() }, T0 + 1);
    engine.handle_signal(&EngineSignal::Cancel { reason: "second".into() }, T0 + 2);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Cancelled);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("SIGNAL_IGNORED"));
    // The original transition is still the one on record
    assert!(state
        .log
        .iter()
        .any(|e| matches!(&e.event, EngineEvent::Cancelled { reason } if reason == "first")));
}

#[test]
fn cancel_while_awaiting_approval_goes_straight_to_cancelled() {
    let mut engine = idle_engine("W", "W-1");
    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("gate")
                .action(muster_core::EngineAction::request_approval_as("ap1")),
        },
        T0 + 1,
    );
    assert_eq!(engine.status(), EngineStatus::AwaitingApproval);

    engine.handle_signal(&EngineSignal::Cancel { reason: "operator".into() }, T0 + 2);
    assert_eq!(engine.status(), EngineStatus::Cancelled);
}

#[test]
fn decisions_after_completion_are_ignored() {
    let mut engine = hello_engine();
    send_ok(&mut engine, "g1-step", T0 + 1);
    assert_eq!(engine.status(), EngineStatus::Completed);
    let artifacts = engine.current_state().artifacts.clone();

    engine.handle_signal(
        &EngineSignal::ApplyDecision {
            decision: EngineDecision::new("late")
                .action(muster_core::EngineAction::annotate("late", true)),
        },
        T0 + 2,
    );

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Completed);
    assert_eq!(state.artifacts, artifacts);
    assert_eq!(state.last_event().map(|e| e.kind()), Some("SIGNAL_IGNORED"));
}

#[test]
fn tombstone_engine_is_born_failed() {
    let engine = EngineWorkflow::failed(
        GoalId::new("g1"),
        WorkflowId::from_string("wfl-test"),
        "ghost-spec",
        T0,
    );

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Failed);
    assert!(matches!(
        state.last_event(),
        Some(EngineEvent::UnknownSpec { spec }) if spec == "ghost-spec"
    ));
}

#[test]
fn tombstone_engine_observes_signals_without_effect() {
    let mut engine = EngineWorkflow::failed(
        GoalId::new("g1"),
        WorkflowId::from_string("wfl-test"),
        "ghost-spec",
        T0,
    );
    send_ok(&mut engine, "W-1", T0 + 1);

    let state = engine.current_state();
    assert_eq!(state.status, EngineStatus::Failed);
    assert!(state.open_steps.is_empty());
    assert_eq!(state.last_event().map(|e| e.kind()), Some("SIGNAL_IGNORED"));
}

#[test]
fn log_grows_monotonically_across_terminal_signals() {
    let mut engine = idle_engine("Y", "Y-1");
    engine.handle_signal(&EngineSignal::Cancel { reason: "stop".into() }, T0 + 1);

    let before = engine.current_state().log.clone();
    send_ok(&mut engine, "Y-1", T0 + 2);
    let after = engine.current_state().log;

    assert_eq!(&after[..before.len()], &before[..], "existing entries never change");
    assert!(after.len() > before.len());
}
