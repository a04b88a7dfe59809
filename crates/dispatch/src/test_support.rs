// SPDX-License-Identifier: MIT

//! Fake agents for tests.

use crate::agent::{Agent, AgentContext, AgentExecError, AgentProfile};
use async_trait::async_trait;
use muster_core::{AgentResponse, ResponseStatus};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Agent that replays a queue of outcomes (OK once the queue is
/// empty) and counts its executions.
pub struct ScriptedAgent {
    name: String,
    outcomes: Mutex<VecDeque<ResponseStatus>>,
    executions: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), outcomes: Mutex::new(VecDeque::new()), executions: AtomicUsize::new(0) }
    }

    /// Queue an outcome for the next execution.
    pub fn then(self, status: ResponseStatus) -> Self {
        self.outcomes.lock().push_back(status);
        self
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn describe(&self) -> AgentProfile {
        AgentProfile::new(self.name.clone())
    }

    async fn execute(
        &self,
        work_kind: &str,
        _payload: &Value,
        ctx: AgentContext,
    ) -> Result<AgentResponse, AgentExecError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let status = self.outcomes.lock().pop_front().unwrap_or(ResponseStatus::Ok);
        Ok(ctx.response(status).content(format!("{}:{}", self.name, work_kind)))
    }
}

type ExecuteFn = dyn Fn(&str, &Value, AgentContext) -> Result<AgentResponse, AgentExecError>
    + Send
    + Sync;

/// Closure-backed agent.
pub struct FnAgent {
    profile: AgentProfile,
    execute: Box<ExecuteFn>,
}

impl FnAgent {
    pub fn new<F>(profile: AgentProfile, execute: F) -> Self
    where
        F: Fn(&str, &Value, AgentContext) -> Result<AgentResponse, AgentExecError>
            + Send
            + Sync
            + 'static,
    {
        Self { profile, execute: Box::new(execute) }
    }
}

#[async_trait]
impl Agent for FnAgent {
    fn describe(&self) -> AgentProfile {
        self.profile.clone()
    }

    async fn execute(
        &self,
        work_kind: &str,
        payload: &Value,
        ctx: AgentContext,
    ) -> Result<AgentResponse, AgentExecError> {
        (self.execute)(work_kind, payload, ctx)
    }
}
