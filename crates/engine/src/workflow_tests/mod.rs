// SPDX-License-Identifier: MIT

mod decisions;
mod determinism;
mod signals;
mod terminal;

use super::*;
use crate::test_support::{assert_invariants, StubSpec};
use muster_core::test_support::{boot_work, fail_response, ok_response, response};
use muster_core::{EngineEvent, EngineSignal, EngineStatus, ResponseStatus, StepStatus};
use serde_json::{json, Value};
use std::sync::Arc;

const T0: u64 = 1_000;

fn start_with(spec: StubSpec) -> EngineWorkflow {
    EngineWorkflow::start(
        GoalId::new("g1"),
        WorkflowId::from_string("wfl-test"),
        Arc::new(spec),
        T0,
    )
}

/// Engine with a spec that finalizes on any completion, booted with
/// one explicit GREET step (the "hello" shape).
fn hello_engine() -> EngineWorkflow {
    let mut engine = start_with(StubSpec::finalizing("hello"));
    engine.boot(&boot_work("GREET", "g1-step"), T0);
    engine
}

/// Engine with a spec that never requests anything (decisions are
/// empty, no finalize), booted with one explicit step.
fn idle_engine(kind: &str, step_id: &str) -> EngineWorkflow {
    let mut engine = start_with(StubSpec::new("idle", |_, _, _| {
        Ok(muster_core::EngineDecision::new("idle"))
    }));
    engine.boot(&boot_work(kind, step_id), T0);
    engine
}

fn send_ok(engine: &mut EngineWorkflow, step_id: &str, at_ms: u64) {
    engine.handle_signal(
        &EngineSignal::AgentCompleted { step_id: step_id.into(), response: ok_response(step_id) },
        at_ms,
    );
}

fn send_fail(engine: &mut EngineWorkflow, step_id: &str, at_ms: u64) {
    engine.handle_signal(
        &EngineSignal::AgentCompleted { step_id: step_id.into(), response: fail_response(step_id) },
        at_ms,
    );
}

fn event_kinds(engine: &EngineWorkflow) -> Vec<&'static str> {
    engine.current_state().log.iter().map(|e| e.event.kind()).collect::<Vec<_>>()
}
