// SPDX-License-Identifier: MIT

//! Durable records: WAL entries and the checkpoint payload.

use muster_core::{EngineDecision, EngineSignal, EngineState, GoalId, WorkflowId};
use muster_engine::DeterministicIds;
use serde::{Deserialize, Serialize};

/// One record in a goal's write-ahead log.
///
/// Timestamps are stamped once, when the record is first appended;
/// replay feeds them back verbatim so engine time is reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum GoalRecord {
    /// Goal started with a resolved spec.
    Started {
        goal_id: GoalId,
        workflow_id: WorkflowId,
        spec: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        boot: Option<EngineDecision>,
        at_ms: u64,
    },

    /// Goal started against an unregistered spec name; the engine is a
    /// FAILED tombstone from birth.
    Tombstone {
        goal_id: GoalId,
        workflow_id: WorkflowId,
        spec: String,
        at_ms: u64,
    },

    /// One inbound signal.
    Signal { at_ms: u64, signal: EngineSignal },
}

/// Snapshot payload: everything needed to rebuild the engine without
/// replaying the full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineCheckpoint {
    pub workflow_id: WorkflowId,
    /// Spec name the goal was started with (the unresolved name for
    /// tombstones).
    pub spec: String,
    /// Whether this goal is an unknown-spec tombstone.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tombstone: bool,
    pub state: EngineState,
    pub ids: DeterministicIds,
    pub now_ms: u64,
}
