// SPDX-License-Identifier: MIT

//! Append-only log event vocabulary.
//!
//! Every state transition the engine makes is recorded as one
//! [`LogEntry`] in `EngineState::log`. Entries are never modified or
//! removed; on a terminal goal only informational entries may still be
//! appended.

use crate::action::EngineDecision;
use crate::response::{ResponseStatus, RunId};
use crate::step::{StepId, StepStatus};
use serde::{Deserialize, Serialize};

/// Events recorded in a goal's log.
///
/// Serializes with `{"event": "APPLY_DECISION", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EngineEvent {
    /// Engine instance came up for this goal
    #[serde(rename = "ENGINE_STARTED")]
    EngineStarted { spec: String },

    /// An `agentCompleted` signal arrived
    #[serde(rename = "AGENT_COMPLETED")]
    AgentCompleted { step_id: StepId, run_id: RunId, status: ResponseStatus },

    /// A decision is about to be applied (spec-returned or external)
    #[serde(rename = "APPLY_DECISION")]
    ApplyDecision { decision: EngineDecision },

    /// Warning: a work request named a step that is not resettable
    #[serde(rename = "REQUEST_IGNORED")]
    RequestIgnored { step_id: StepId, status: StepStatus },

    /// An approval step was granted
    #[serde(rename = "APPROVED")]
    Approved { step_id: StepId },

    /// A `custom` signal arrived for the spec
    #[serde(rename = "CUSTOM_EVENT")]
    CustomEvent { event_type: String },

    /// A decision with `finalize` completed the goal
    #[serde(rename = "FINALIZED")]
    Finalized,

    /// The goal was cancelled
    #[serde(rename = "CANCELLED")]
    Cancelled { reason: String },

    /// Decision application aborted (invalid action)
    #[serde(rename = "APPLICATION_ERROR")]
    ApplicationError { detail: String },

    /// A spec callback returned an error
    #[serde(rename = "SPEC_ERROR")]
    SpecError { detail: String },

    /// Engine started for a spec name with no registration
    #[serde(rename = "UNKNOWN_SPEC")]
    UnknownSpec { spec: String },

    /// Informational: a signal arrived after the goal reached a
    /// terminal status and was observed without effect
    #[serde(rename = "SIGNAL_IGNORED")]
    SignalIgnored { signal: String },
}

impl EngineEvent {
    /// Event tag as recorded on the wire (for assertions and tracing).
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::EngineStarted { .. } => "ENGINE_STARTED",
            EngineEvent::AgentCompleted { .. } => "AGENT_COMPLETED",
            EngineEvent::ApplyDecision { .. } => "APPLY_DECISION",
            EngineEvent::RequestIgnored { .. } => "REQUEST_IGNORED",
            EngineEvent::Approved { .. } => "APPROVED",
            EngineEvent::CustomEvent { .. } => "CUSTOM_EVENT",
            EngineEvent::Finalized => "FINALIZED",
            EngineEvent::Cancelled { .. } => "CANCELLED",
            EngineEvent::ApplicationError { .. } => "APPLICATION_ERROR",
            EngineEvent::SpecError { .. } => "SPEC_ERROR",
            EngineEvent::UnknownSpec { .. } => "UNKNOWN_SPEC",
            EngineEvent::SignalIgnored { .. } => "SIGNAL_IGNORED",
        }
    }

    /// Whether the entry records a transition into a terminal status.
    pub fn is_terminal_transition(&self) -> bool {
        matches!(
            self,
            EngineEvent::Finalized
                | EngineEvent::Cancelled { .. }
                | EngineEvent::ApplicationError { .. }
                | EngineEvent::SpecError { .. }
                | EngineEvent::UnknownSpec { .. }
        )
    }
}

/// One entry in a goal's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: EngineEvent,
}

impl LogEntry {
    pub fn new(at_ms: u64, event: EngineEvent) -> Self {
        Self { at_ms, event }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
