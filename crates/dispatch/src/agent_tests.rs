// SPDX-License-Identifier: MIT

use super::*;

fn ctx() -> AgentContext {
    AgentContext {
        goal_id: GoalId::new("g1"),
        workflow_id: WorkflowId::from_string("wfl-1"),
        step_id: StepId::new("GREET-1"),
        run_id: RunId::from_string("run-1"),
        agent_role: "greeter".into(),
    }
}

#[test]
fn context_responses_echo_identity() {
    let response = ctx().ok();
    assert_eq!(response.goal_id, "g1");
    assert_eq!(response.step_id, "GREET-1");
    assert_eq!(response.run_id, RunId::from_string("run-1"));
    assert_eq!(response.agent_role, "greeter");
    assert_eq!(response.status, ResponseStatus::Ok);
}

#[yare::parameterized(
    ok      = { ResponseStatus::Ok },
    partial = { ResponseStatus::Partial },
    fail    = { ResponseStatus::Fail },
)]
fn response_constructors(status: ResponseStatus) {
    assert_eq!(ctx().response(status).status, status);
}

#[test]
fn profile_accumulates_kinds() {
    let profile = AgentProfile::new("writer").kind("DRAFT").kind("EDIT");
    assert_eq!(profile.supported_kinds, vec!["DRAFT", "EDIT"]);
}

#[test]
fn exec_error_messages() {
    assert_eq!(
        AgentExecError::UnsupportedKind("X".into()).to_string(),
        "agent does not handle kind X"
    );
    assert_eq!(AgentExecError::Failed("timeout".into()).to_string(), "timeout");
}
