// SPDX-License-Identifier: MIT

//! Shared fixtures for tests across the workspace.
//!
//! Gated behind the `test-support` feature so downstream crates can use
//! them in dev-dependencies without shipping them in release builds.

use crate::action::EngineDecision;
use crate::goal::{GoalId, WorkflowId};
use crate::response::{AgentResponse, ResponseStatus, RunId};
use crate::step::StepId;

/// A response envelope with throwaway identity fields, for tests that
/// only care about the step and status.
pub fn response(step_id: impl Into<StepId>, status: ResponseStatus) -> AgentResponse {
    AgentResponse::new(
        GoalId::new("goal-test"),
        WorkflowId::from_string("wfl-test"),
        step_id.into(),
        RunId::from_string("run-test"),
        status,
    )
}

/// An OK response for a step.
pub fn ok_response(step_id: impl Into<StepId>) -> AgentResponse {
    response(step_id, ResponseStatus::Ok)
}

/// A FAIL response for a step.
pub fn fail_response(step_id: impl Into<StepId>) -> AgentResponse {
    response(step_id, ResponseStatus::Fail)
}

/// A boot decision opening a single step with an explicit ID.
pub fn boot_work(kind: &str, step_id: &str) -> EngineDecision {
    EngineDecision::new("boot").action(crate::action::EngineAction::request_work_as(kind, step_id))
}
