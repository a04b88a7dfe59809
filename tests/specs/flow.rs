// SPDX-License-Identifier: MIT

//! Single-step and multi-phase goal flows driven by the dispatcher.

use super::prelude::*;

fn hello_policy(
    _state: &EngineState,
    response: &AgentResponse,
    _ctx: &mut ExecContext<'_>,
) -> Result<EngineDecision, SpecError> {
    if response.status == ResponseStatus::Ok {
        Ok(EngineDecision::finish("hello-done"))
    } else {
        Ok(EngineDecision::new("hello-wait"))
    }
}

fn two_phase_policy(
    _state: &EngineState,
    response: &AgentResponse,
    _ctx: &mut ExecContext<'_>,
) -> Result<EngineDecision, SpecError> {
    if !response.is_ok() {
        return Ok(EngineDecision::new("hold"));
    }
    if response.step_id.as_str().starts_with("A-") {
        return Ok(EngineDecision::new("phase-b").action(EngineAction::request_work("B")));
    }
    if response.step_id.as_str().starts_with("B-") {
        return Ok(EngineDecision::finish("both-phases-done"));
    }
    Ok(EngineDecision::new("hold"))
}

#[tokio::test]
async fn hello_goal_completes_after_one_ok() {
    let harness = Harness::new(
        Coordinator::builder()
            .register_spec(policy("hello", hello_policy))
            .register_agent(ok_agent("greeter"))
            .route("GREET", "greeter"),
    );

    let handle =
        harness.start(StartGoal::new("hello-1", "hello").boot_decision(boot("GREET", "g1")));
    let status = harness.dispatcher.run(&handle).await;

    assert_eq!(status, EngineStatus::Completed);
    let state = handle.current_state();
    assert_eq!(state.step("g1").map(|s| s.status), Some(StepStatus::Done));
}

#[tokio::test]
async fn two_phase_goal_opens_b_after_a_and_completes() {
    let harness = Harness::new(
        Coordinator::builder()
            .register_spec(policy("two-phase", two_phase_policy))
            .register_agent(ok_agent("worker"))
            .route("A", "worker")
            .route("B", "worker"),
    );

    let handle =
        harness.start(StartGoal::new("phases-1", "two-phase").boot_decision(boot("A", "A-1")));
    let status = harness.dispatcher.run(&handle).await;

    assert_eq!(status, EngineStatus::Completed);
    let state = handle.current_state();
    assert_eq!(state.step("A-1").map(|s| s.status), Some(StepStatus::Done));

    let (b_id, b_step) = state
        .open_steps
        .iter()
        .find(|(id, _)| id.as_str().starts_with("B-"))
        .expect("phase B step minted");
    assert_eq!(b_step.status, StepStatus::Done);
    assert_eq!(b_step.kind, "B");
    assert!(b_id.as_str().len() > 2, "minted id carries a uuid suffix");
}

#[tokio::test]
async fn failed_step_can_be_retried_by_the_spec() {
    fn retry_policy(
        state: &EngineState,
        response: &AgentResponse,
        _ctx: &mut ExecContext<'_>,
    ) -> Result<EngineDecision, SpecError> {
        if response.is_fail() {
            // One retry, tracked in artifacts.
            if state.artifacts.contains_key("retried") {
                return Ok(EngineDecision::finish("give-up"));
            }
            return Ok(EngineDecision::new("retry")
                .action(EngineAction::annotate("retried", true))
                .action(EngineAction::request_work_as(
                    "FLAKY",
                    response.step_id.as_str(),
                )));
        }
        Ok(EngineDecision::finish("recovered"))
    }

    let flaky = Arc::new(ScriptedAgent::new("flaky").then(ResponseStatus::Fail));
    let harness = Harness::new(
        Coordinator::builder()
            .register_spec(policy("retrying", retry_policy))
            .register_agent(Arc::new(FnAgentFactory::new("flaky", {
                let flaky = flaky.clone();
                move || flaky.clone() as Arc<dyn Agent>
            })))
            .route("FLAKY", "flaky"),
    );

    let handle =
        harness.start(StartGoal::new("retry-1", "retrying").boot_decision(boot("FLAKY", "F-1")));
    let status = harness.dispatcher.run(&handle).await;

    assert_eq!(status, EngineStatus::Completed);
    assert_eq!(flaky.executions(), 2, "failed once, retried once");
    let state = handle.current_state();
    assert_eq!(state.step("F-1").map(|s| s.status), Some(StepStatus::Done));
    assert_eq!(state.artifacts.get("retried"), Some(&serde_json::json!(true)));
}
