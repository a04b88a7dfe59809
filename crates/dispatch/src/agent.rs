// SPDX-License-Identifier: MIT

//! The agent seam: stateless executors of single steps.
//!
//! Agents may perform I/O, retries, and timeouts internally; the core
//! never observes those. An agent returns one fully materialized
//! response per run and must echo the identity fields it was handed
//! (the constructors on [`AgentContext`] do that).

use async_trait::async_trait;
use muster_core::{AgentResponse, GoalId, ResponseStatus, RunId, StepId, WorkflowId};
use serde_json::Value;
use thiserror::Error;

/// Failure inside an agent that produced no response envelope.
///
/// The dispatcher converts this into a synthesized FAIL response so the
/// spec always observes a completion.
#[derive(Debug, Error)]
pub enum AgentExecError {
    #[error("agent does not handle kind {0}")]
    UnsupportedKind(String),
    #[error("{0}")]
    Failed(String),
}

/// Static description of an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: String,
    pub supported_kinds: Vec<String>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), supported_kinds: Vec::new() }
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.supported_kinds.push(kind.into());
        self
    }
}

/// Identity of one step run, handed to the agent.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub goal_id: GoalId,
    pub workflow_id: WorkflowId,
    pub step_id: StepId,
    pub run_id: RunId,
    pub agent_role: String,
}

impl AgentContext {
    /// A response envelope echoing this run's identity fields.
    pub fn response(&self, status: ResponseStatus) -> AgentResponse {
        AgentResponse::new(
            self.goal_id.clone(),
            self.workflow_id.clone(),
            self.step_id.clone(),
            self.run_id.clone(),
            status,
        )
        .agent_role(self.agent_role.clone())
    }

    pub fn ok(&self) -> AgentResponse {
        self.response(ResponseStatus::Ok)
    }

    pub fn partial(&self) -> AgentResponse {
        self.response(ResponseStatus::Partial)
    }

    pub fn fail(&self) -> AgentResponse {
        self.response(ResponseStatus::Fail)
    }
}

/// A stateless executor of single steps.
#[async_trait]
pub trait Agent: Send + Sync {
    fn describe(&self) -> AgentProfile;

    async fn execute(
        &self,
        work_kind: &str,
        payload: &Value,
        ctx: AgentContext,
    ) -> Result<AgentResponse, AgentExecError>;
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
