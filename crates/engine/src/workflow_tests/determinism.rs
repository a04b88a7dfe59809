// SPDX-License-Identifier: MIT

//! Property suite: equal signal sequences produce equal final states,
//! invariants hold at every step, and the log is append-only.

use super::*;
use muster_core::{EngineAction, EngineDecision};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Ok(u8),
    Fail(u8),
    Partial(u8),
    Approve(u8),
    Cancel,
    Custom(bool),
    Annotate(u8),
    RequestWork(u8),
    Finalize,
}

fn step_name(idx: u8) -> String {
    format!("s{}", idx % 4)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Ok),
        any::<u8>().prop_map(Op::Fail),
        any::<u8>().prop_map(Op::Partial),
        any::<u8>().prop_map(Op::Approve),
        Just(Op::Cancel),
        any::<bool>().prop_map(Op::Custom),
        any::<u8>().prop_map(Op::Annotate),
        any::<u8>().prop_map(Op::RequestWork),
        Just(Op::Finalize),
    ]
}

/// A pure spec: re-requests failed steps once per failure, opens a
/// minted follow-up step on every third artifact, and gates on a
/// custom event.
fn scripted_spec() -> StubSpec {
    StubSpec::new("scripted", |state, response, ctx| {
        let mut decision = EngineDecision::new("scripted");
        if response.is_fail() {
            decision = decision.action(
                EngineAction::request_work_as("RETRY", response.step_id.as_str()),
            );
        } else if state.artifacts.len() % 3 == 0 {
            decision = decision.action(EngineAction::request_work("FOLLOWUP"));
        }
        decision = decision
            .action(EngineAction::annotate(format!("seen:{}", response.step_id), ctx.now_ms()));
        Ok(decision)
    })
    .with_custom(|_, event_type, _| {
        if event_type == "scripted:gate" {
            Ok(Some(
                EngineDecision::new("gate").action(EngineAction::request_approval_as("gate-1")),
            ))
        } else {
            Ok(None)
        }
    })
}

fn build_engine() -> EngineWorkflow {
    let mut engine = start_with(scripted_spec());
    engine.boot(
        &EngineDecision::new("boot")
            .action(EngineAction::request_work_as("A", "s0"))
            .action(EngineAction::request_work_as("A", "s1")),
        T0,
    );
    engine
}

fn apply_op(engine: &mut EngineWorkflow, op: &Op, at_ms: u64) {
    let signal = match op {
        Op::Ok(i) => EngineSignal::AgentCompleted {
            step_id: step_name(*i).into(),
            response: ok_response(step_name(*i)),
        },
        Op::Fail(i) => EngineSignal::AgentCompleted {
            step_id: step_name(*i).into(),
            response: fail_response(step_name(*i)),
        },
        Op::Partial(i) => EngineSignal::AgentCompleted {
            step_id: step_name(*i).into(),
            response: response(step_name(*i), ResponseStatus::Partial),
        },
        Op::Approve(i) => EngineSignal::Approve { step_id: step_name(*i).into() },
        Op::Cancel => EngineSignal::Cancel { reason: "prop".into() },
        Op::Custom(gate) => EngineSignal::Custom {
            event_type: if *gate { "scripted:gate".into() } else { "scripted:other".into() },
            payload: Value::Null,
        },
        Op::Annotate(i) => EngineSignal::ApplyDecision {
            decision: EngineDecision::new("ext")
                .action(EngineAction::annotate(format!("ext:{}", i % 8), *i)),
        },
        Op::RequestWork(i) => EngineSignal::ApplyDecision {
            decision: EngineDecision::new("ext")
                .action(EngineAction::request_work_as("B", step_name(*i))),
        },
        Op::Finalize => EngineSignal::ApplyDecision { decision: EngineDecision::finish("ext") },
    };
    engine.handle_signal(&signal, at_ms);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn equal_sequences_produce_equal_states(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let mut a = build_engine();
        let mut b = build_engine();

        let mut prev_log_len = 0usize;
        for (i, op) in ops.iter().enumerate() {
            let at_ms = T0 + 1 + i as u64;
            apply_op(&mut a, op, at_ms);
            apply_op(&mut b, op, at_ms);

            let state = a.current_state();
            assert_invariants(&state);
            prop_assert!(state.log.len() >= prev_log_len, "log shrank");
            prev_log_len = state.log.len();
        }

        prop_assert_eq!(a.current_state(), b.current_state());
    }

    #[test]
    fn terminal_states_freeze_everything_but_the_log(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut engine = build_engine();
        let mut frozen: Option<muster_core::EngineState> = None;

        for (i, op) in ops.iter().enumerate() {
            apply_op(&mut engine, op, T0 + 1 + i as u64);
            let state = engine.current_state();

            if let Some(prior) = &frozen {
                prop_assert_eq!(&state.status, &prior.status);
                prop_assert_eq!(&state.open_steps, &prior.open_steps);
                prop_assert_eq!(&state.artifacts, &prior.artifacts);
            } else if state.status.is_terminal() {
                frozen = Some(state);
            }
        }
    }
}
