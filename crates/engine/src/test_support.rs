// SPDX-License-Identifier: MIT

//! Closure-backed spec and invariant assertions for tests.

use crate::context::ExecContext;
use crate::spec::{ArtifactView, Spec, SpecError};
use muster_core::{AgentResponse, EngineDecision, EngineState, EngineStatus};
use serde_json::Value;

type OnCompleted = dyn Fn(&EngineState, &AgentResponse, &mut ExecContext<'_>) -> Result<EngineDecision, SpecError>
    + Send
    + Sync;
type OnCustom =
    dyn Fn(&EngineState, &str, &Value) -> Result<Option<EngineDecision>, SpecError> + Send + Sync;
type PostApply = dyn Fn(&mut ArtifactView<'_>) -> Result<(), SpecError> + Send + Sync;

/// A spec assembled from closures.
pub struct StubSpec {
    name: String,
    on_completed: Box<OnCompleted>,
    on_custom: Option<Box<OnCustom>>,
    post: Option<Box<PostApply>>,
}

impl StubSpec {
    pub fn new<F>(name: impl Into<String>, on_completed: F) -> Self
    where
        F: Fn(&EngineState, &AgentResponse, &mut ExecContext<'_>) -> Result<EngineDecision, SpecError>
            + Send
            + Sync
            + 'static,
    {
        Self { name: name.into(), on_completed: Box::new(on_completed), on_custom: None, post: None }
    }

    /// A spec that finalizes on any agent completion.
    pub fn finalizing(name: impl Into<String>) -> Self {
        Self::new(name, |_, _, _| Ok(EngineDecision::finish("finish")))
    }

    pub fn with_custom<F>(mut self, on_custom: F) -> Self
    where
        F: Fn(&EngineState, &str, &Value) -> Result<Option<EngineDecision>, SpecError>
            + Send
            + Sync
            + 'static,
    {
        self.on_custom = Some(Box::new(on_custom));
        self
    }

    pub fn with_post_apply<F>(mut self, post: F) -> Self
    where
        F: Fn(&mut ArtifactView<'_>) -> Result<(), SpecError> + Send + Sync + 'static,
    {
        self.post = Some(Box::new(post));
        self
    }
}

impl Spec for StubSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_agent_completed(
        &self,
        state: &EngineState,
        response: &AgentResponse,
        ctx: &mut ExecContext<'_>,
    ) -> Result<EngineDecision, SpecError> {
        (self.on_completed)(state, response, ctx)
    }

    fn on_custom_event(
        &self,
        state: &EngineState,
        event_type: &str,
        payload: &Value,
    ) -> Result<Option<EngineDecision>, SpecError> {
        match &self.on_custom {
            Some(f) => f(state, event_type, payload),
            None => Ok(None),
        }
    }

    fn post_apply(&self, view: &mut ArtifactView<'_>) -> Result<(), SpecError> {
        match &self.post {
            Some(f) => f(view),
            None => Ok(()),
        }
    }
}

/// Assert the state invariants that must hold for every reachable
/// state of every goal.
#[allow(clippy::panic)]
pub fn assert_invariants(state: &EngineState) {
    for (id, step) in &state.open_steps {
        assert!(
            step.updated_at_ms >= step.requested_at_ms,
            "step {id}: updated_at {} < requested_at {}",
            step.updated_at_ms,
            step.requested_at_ms,
        );
    }

    if !state.status.is_terminal() {
        assert_eq!(
            state.status == EngineStatus::AwaitingApproval,
            state.has_waiting_approval(),
            "approval gate out of sync with waiting approval steps",
        );
    }
}
