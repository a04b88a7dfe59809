// SPDX-License-Identifier: MIT

//! Engine signal surface.
//!
//! The named messages an engine instance accepts. Delivery is
//! at-least-once and unordered with respect to other signals; every
//! handler is written to tolerate duplicates.

use crate::action::EngineDecision;
use crate::response::AgentResponse;
use crate::step::StepId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signals that drive state transitions in an engine instance.
///
/// Serializes with `{"signal": "agent:completed", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal")]
pub enum EngineSignal {
    /// An agent finished (or failed, or partially progressed) a step.
    #[serde(rename = "agent:completed")]
    AgentCompleted { step_id: StepId, response: AgentResponse },

    /// Externally-supplied decision (boot or admin override).
    #[serde(rename = "decision:apply")]
    ApplyDecision { decision: EngineDecision },

    /// Grant an approval step.
    #[serde(rename = "approval:grant")]
    Approve { step_id: StepId },

    /// Cancel the goal. Idempotent.
    #[serde(rename = "goal:cancel")]
    Cancel { reason: String },

    /// Spec-defined event, routed to `Spec::on_custom_event`.
    #[serde(rename = "spec:custom")]
    Custom {
        event_type: String,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        payload: Value,
    },
}

impl EngineSignal {
    /// Signal name for log spans (e.g., "agent_completed")
    pub fn name(&self) -> &'static str {
        match self {
            EngineSignal::AgentCompleted { .. } => "agent_completed",
            EngineSignal::ApplyDecision { .. } => "apply_decision",
            EngineSignal::Approve { .. } => "approve",
            EngineSignal::Cancel { .. } => "cancel",
            EngineSignal::Custom { .. } => "custom",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            EngineSignal::AgentCompleted { step_id, response } => vec![
                ("step_id", step_id.to_string()),
                ("run_id", response.run_id.to_string()),
                ("status", response.status.to_string()),
            ],
            EngineSignal::ApplyDecision { decision } => vec![
                ("decision_id", decision.decision_id.clone()),
                ("actions", decision.actions.len().to_string()),
                ("finalize", decision.finalize.to_string()),
            ],
            EngineSignal::Approve { step_id } => vec![("step_id", step_id.to_string())],
            EngineSignal::Cancel { reason } => vec![("reason", reason.clone())],
            EngineSignal::Custom { event_type, .. } => {
                vec![("event_type", event_type.clone())]
            }
        }
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
