// SPDX-License-Identifier: MIT

//! Step identity and state.
//!
//! A step is a unit of work opened by a decision and eventually settled
//! by an agent response (or an approval). The core assigns no meaning to
//! a step's `kind` beyond the reserved [`APPROVAL_KIND`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

/// Reserved step kind opened by `REQUEST_APPROVAL` actions.
pub const APPROVAL_KIND: &str = "APPROVAL";

/// Step kind recorded when `agentCompleted` arrives for a step the
/// engine never opened (the upsert keeps history honest).
pub const UNKNOWN_KIND: &str = "unknown";

/// Identifier for a step, unique within one engine instance.
///
/// Auto-minted IDs follow `{workKind}-{uuid}`; explicitly supplied IDs
/// are opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(SmolStr);

impl StepId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(SmolStr::new(&s))
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<str> for StepId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StepId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Status of an open step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    /// Opened and waiting for a dispatcher to run it
    Waiting,
    /// An agent reported partial progress
    InProgress,
    /// Settled successfully (agent OK or approval granted)
    Done,
    /// Settled unsuccessfully (agent FAIL)
    Failed,
    /// Parked by a spec; never dispatched
    Blocked,
}

impl StepStatus {
    /// Whether a dispatcher should pick this step up.
    pub fn is_waiting(&self) -> bool {
        matches!(self, StepStatus::Waiting)
    }

    /// Whether the step has reached a settled outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, StepStatus::Done | StepStatus::Failed)
    }

    /// Whether a `REQUEST_WORK` naming this step may reset it.
    ///
    /// Only WAITING and FAILED steps are resettable; DONE steps are
    /// immutable and IN_PROGRESS/BLOCKED steps keep their run.
    pub fn is_resettable(&self) -> bool {
        matches!(self, StepStatus::Waiting | StepStatus::Failed)
    }
}

crate::simple_display! {
    StepStatus {
        Waiting => "waiting",
        InProgress => "in_progress",
        Done => "done",
        Failed => "failed",
        Blocked => "blocked",
    }
}

/// State of one open step, owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    /// Opaque work category (e.g. `REQUIREMENTS`, `IMPLEMENT`)
    pub kind: SmolStr,
    pub status: StepStatus,
    pub requested_at_ms: u64,
    pub updated_at_ms: u64,
    /// Opaque payload supplied when the step was requested
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl StepState {
    /// Open a fresh WAITING step.
    pub fn open(kind: impl AsRef<str>, payload: Value, at_ms: u64) -> Self {
        Self {
            kind: SmolStr::new(kind.as_ref()),
            status: StepStatus::Waiting,
            requested_at_ms: at_ms,
            updated_at_ms: at_ms,
            payload,
        }
    }

    pub fn is_approval(&self) -> bool {
        self.kind == APPROVAL_KIND
    }

    /// A WAITING step of the reserved approval kind.
    pub fn is_waiting_approval(&self) -> bool {
        self.is_approval() && self.status.is_waiting()
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
