// SPDX-License-Identifier: MIT

//! Engine-owned goal state.
//!
//! Exclusively owned by one engine instance; external components read
//! it through the `currentState` query and mutate it only via signals.

use crate::event::{EngineEvent, LogEntry};
use crate::goal::GoalId;
use crate::step::{StepId, StepState};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Goal-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineStatus {
    Running,
    AwaitingApproval,
    Completed,
    Failed,
    Cancelled,
}

impl EngineStatus {
    /// Terminal statuses accept signals but never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineStatus::Completed | EngineStatus::Failed | EngineStatus::Cancelled
        )
    }
}

crate::simple_display! {
    EngineStatus {
        Running => "running",
        AwaitingApproval => "awaiting_approval",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Complete state of one goal.
///
/// `open_steps` and `artifacts` use insertion-ordered maps so that
/// serialized state is byte-stable under replay; the order itself
/// carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub goal_id: GoalId,
    pub status: EngineStatus,
    #[serde(default)]
    pub open_steps: IndexMap<StepId, StepState>,
    #[serde(default)]
    pub artifacts: IndexMap<String, Value>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl EngineState {
    pub fn new(goal_id: GoalId) -> Self {
        Self {
            goal_id,
            status: EngineStatus::Running,
            open_steps: IndexMap::new(),
            artifacts: IndexMap::new(),
            log: Vec::new(),
        }
    }

    /// Look up a step by ID.
    pub fn step(&self, id: &str) -> Option<&StepState> {
        self.open_steps.get(id)
    }

    /// Steps a dispatcher should pick up.
    pub fn waiting_steps(&self) -> impl Iterator<Item = (&StepId, &StepState)> {
        self.open_steps.iter().filter(|(_, s)| s.status.is_waiting())
    }

    /// Whether any APPROVAL step is still waiting for a grant.
    pub fn has_waiting_approval(&self) -> bool {
        self.open_steps.values().any(|s| s.is_waiting_approval())
    }

    /// The most recently appended log event.
    pub fn last_event(&self) -> Option<&EngineEvent> {
        self.log.last().map(|e| &e.event)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
