// SPDX-License-Identifier: MIT

//! Engine actions and decisions.
//!
//! A decision is the structured output of a spec: an ordered sequence
//! of actions plus an optional finalize flag. Actions are the closed
//! set of effects a spec may request from the engine.

use crate::response::RunId;
use crate::step::StepId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Effects a spec may request from the engine.
///
/// Serializes with `{"type": "REQUEST_WORK", ...fields}` format.
/// Unknown type tags deserialize to `Unsupported`, which the engine
/// fails explicitly rather than silently ignoring, since decisions can
/// arrive from external clients over the `applyDecision` signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineAction {
    /// Open a new WAITING step of the given kind.
    #[serde(rename = "REQUEST_WORK")]
    RequestWork {
        work_kind: String,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        payload: Value,
        /// Engine mints `{workKind}-{uuid}` when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<StepId>,
    },

    /// Open a WAITING APPROVAL step and gate the goal on it.
    #[serde(rename = "REQUEST_APPROVAL")]
    RequestApproval {
        #[serde(default, skip_serializing_if = "Value::is_null")]
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<StepId>,
    },

    /// Write a value into the goal's artifact map (overwrites).
    #[serde(rename = "ANNOTATE")]
    Annotate { key: String, value: Value },

    /// Catch-all for unknown wire tags; applying it fails the goal.
    /// Serializes under its own tag so a logged decision that carried
    /// one still snapshots cleanly.
    #[serde(other)]
    Unsupported,
}

impl EngineAction {
    /// Action name for log spans
    pub fn name(&self) -> &'static str {
        match self {
            EngineAction::RequestWork { .. } => "request_work",
            EngineAction::RequestApproval { .. } => "request_approval",
            EngineAction::Annotate { .. } => "annotate",
            EngineAction::Unsupported => "unsupported",
        }
    }

    pub fn request_work(work_kind: impl Into<String>) -> Self {
        EngineAction::RequestWork { work_kind: work_kind.into(), payload: Value::Null, step_id: None }
    }

    pub fn request_work_as(work_kind: impl Into<String>, step_id: impl Into<StepId>) -> Self {
        EngineAction::RequestWork {
            work_kind: work_kind.into(),
            payload: Value::Null,
            step_id: Some(step_id.into()),
        }
    }

    pub fn request_approval() -> Self {
        EngineAction::RequestApproval { payload: Value::Null, step_id: None }
    }

    pub fn request_approval_as(step_id: impl Into<StepId>) -> Self {
        EngineAction::RequestApproval { payload: Value::Null, step_id: Some(step_id.into()) }
    }

    pub fn annotate(key: impl Into<String>, value: impl Into<Value>) -> Self {
        EngineAction::Annotate { key: key.into(), value: value.into() }
    }

    /// Attach a payload to a work/approval request; no-op for other actions.
    pub fn payload(mut self, value: impl Into<Value>) -> Self {
        match &mut self {
            EngineAction::RequestWork { payload, .. }
            | EngineAction::RequestApproval { payload, .. } => *payload = value.into(),
            _ => {}
        }
        self
    }
}

/// What a decision was produced in response to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasedOn {
    pub step_id: StepId,
    pub run_id: RunId,
}

/// Structured output of a spec: actions to apply plus optional finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineDecision {
    pub decision_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub based_on: Option<BasedOn>,
    #[serde(default)]
    pub actions: Vec<EngineAction>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub finalize: bool,
}

impl EngineDecision {
    pub fn new(decision_id: impl Into<String>) -> Self {
        Self { decision_id: decision_id.into(), based_on: None, actions: Vec::new(), finalize: false }
    }

    pub fn action(mut self, action: EngineAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn based_on(mut self, step_id: impl Into<StepId>, run_id: RunId) -> Self {
        self.based_on = Some(BasedOn { step_id: step_id.into(), run_id });
        self
    }

    pub fn finalize(mut self) -> Self {
        self.finalize = true;
        self
    }

    /// A decision that requests nothing and completes the goal.
    pub fn finish(decision_id: impl Into<String>) -> Self {
        Self::new(decision_id).finalize()
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
