// SPDX-License-Identifier: MIT

//! The spec seam: pluggable deterministic policy.
//!
//! A spec is consulted after each state transition and answers with a
//! decision (actions plus optional finalize). Specs are pure: equal
//! inputs must produce equal decisions, and all time/randomness comes
//! from the [`ExecContext`](crate::ExecContext). A spec holds no state
//! of its own between invocations; anything it needs to remember lives
//! in `state.artifacts` under keys it controls.

use crate::context::ExecContext;
use indexmap::IndexMap;
use muster_core::{AgentResponse, EngineDecision, EngineState, EngineStatus, StepId, StepState};
use serde_json::Value;
use thiserror::Error;

/// Error surfaced by a spec callback.
///
/// The engine treats any spec error as fatal for the goal
/// (`SPEC_ERROR` log event, status `FAILED`).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SpecError {
    pub message: String,
}

impl SpecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<String> for SpecError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for SpecError {
    fn from(message: &str) -> Self {
        Self { message: message.to_string() }
    }
}

/// Restricted state view for [`Spec::post_apply`].
///
/// Exposes the full state read-only but allows mutating artifacts
/// only, so a normalization pass cannot touch steps or status.
pub struct ArtifactView<'a> {
    status: EngineStatus,
    open_steps: &'a IndexMap<StepId, StepState>,
    artifacts: &'a mut IndexMap<String, Value>,
}

impl<'a> ArtifactView<'a> {
    pub(crate) fn new(
        status: EngineStatus,
        open_steps: &'a IndexMap<StepId, StepState>,
        artifacts: &'a mut IndexMap<String, Value>,
    ) -> Self {
        Self { status, open_steps, artifacts }
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn open_steps(&self) -> &IndexMap<StepId, StepState> {
        self.open_steps
    }

    pub fn artifact(&self, key: &str) -> Option<&Value> {
        self.artifacts.get(key)
    }

    pub fn set_artifact(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.artifacts.insert(key.into(), value.into());
    }

    pub fn remove_artifact(&mut self, key: &str) -> Option<Value> {
        self.artifacts.shift_remove(key)
    }
}

/// A named, deterministic, pure policy driving one goal.
pub trait Spec: Send + Sync {
    /// Identity used to resolve the spec at goal start.
    fn name(&self) -> &str;

    /// Called once per `agentCompleted` signal, after the engine has
    /// updated the step and indexed the response's artifacts.
    fn on_agent_completed(
        &self,
        state: &EngineState,
        response: &AgentResponse,
        ctx: &mut ExecContext<'_>,
    ) -> Result<EngineDecision, SpecError>;

    /// Called when a `custom(eventType, payload)` signal arrives.
    /// Return `None` to ignore the event.
    fn on_custom_event(
        &self,
        state: &EngineState,
        event_type: &str,
        payload: &Value,
    ) -> Result<Option<EngineDecision>, SpecError> {
        let _ = (state, event_type, payload);
        Ok(None)
    }

    /// Called after each applied decision; may normalize artifacts.
    /// Must be idempotent.
    fn post_apply(&self, view: &mut ArtifactView<'_>) -> Result<(), SpecError> {
        let _ = view;
        Ok(())
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
