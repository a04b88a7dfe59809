// SPDX-License-Identifier: MIT

//! Agent response envelope.
//!
//! The envelope an agent returns for one step run. The dispatcher
//! forwards it verbatim in an `agentCompleted` signal; the engine
//! updates the step from `status` and indexes `artifacts` before
//! handing the whole envelope to the spec.

use crate::goal::{GoalId, WorkflowId};
use crate::step::StepId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;
use std::fmt;

/// Identifier for one dispatch of one step.
///
/// Minted by the dispatcher per execution; `{stepId}:{runId}` is the
/// dedup correlation key. Agents must echo it so completions can be
/// correlated with their dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(SmolStr);

impl RunId {
    pub const PREFIX: &'static str = "run-";

    /// Mint a fresh run identity.
    pub fn new() -> Self {
        Self(crate::id::mint(Self::PREFIX))
    }

    /// Rebuild from a recorded identity.
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(SmolStr::new(&s))
    }
}

impl std::borrow::Borrow<str> for RunId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<str> for RunId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RunId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Outcome an agent reports for a step run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Ok,
    Partial,
    Fail,
}

crate::simple_display! {
    ResponseStatus {
        Ok => "ok",
        Partial => "partial",
        Fail => "fail",
    }
}

/// One artifact produced by an agent, indexed into goal state under
/// `"{type}:{ref}"` (or a fresh deterministic UUID when `ref` is absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ArtifactEntry {
    pub fn new(entry_type: impl Into<String>) -> Self {
        Self { entry_type: entry_type.into(), ref_id: None, url: None, meta: None }
    }

    crate::setters! {
        option {
            ref_id: String,
            url: String,
            meta: Value,
        }
    }
}

/// Structured error reported by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl ResponseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into() }
    }

    crate::setters! {
        option { code: String }
    }
}

/// Fully materialized response for one step run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub goal_id: GoalId,
    pub workflow_id: WorkflowId,
    pub step_id: StepId,
    pub run_id: RunId,
    #[serde(default)]
    pub agent_role: String,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactEntry>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metrics: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
}

impl AgentResponse {
    pub fn new(
        goal_id: GoalId,
        workflow_id: WorkflowId,
        step_id: StepId,
        run_id: RunId,
        status: ResponseStatus,
    ) -> Self {
        Self {
            goal_id,
            workflow_id,
            step_id,
            run_id,
            agent_role: String::new(),
            status,
            content: None,
            artifacts: Vec::new(),
            metrics: Map::new(),
            errors: Vec::new(),
        }
    }

    crate::setters! {
        into { agent_role: String }
        option { content: String }
    }

    pub fn artifact(mut self, entry: ArtifactEntry) -> Self {
        self.artifacts.push(entry);
        self
    }

    pub fn metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    pub fn error(mut self, err: ResponseError) -> Self {
        self.errors.push(err);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn is_fail(&self) -> bool {
        self.status == ResponseStatus::Fail
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
