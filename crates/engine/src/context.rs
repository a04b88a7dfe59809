// SPDX-License-Identifier: MIT

//! Deterministic time and identity for workflow code.
//!
//! Engine and spec code must never read the system clock or system
//! randomness: replaying the recorded signal sequence has to mint the
//! exact same step IDs and timestamps. Time comes from the stamp the
//! host recorded on each signal; IDs come from a seeded counter-hash
//! source whose counter is part of every checkpoint.

use muster_core::{GoalId, StepId, WorkflowId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Replay-stable ID and randomness source.
///
/// Draw `n` is `sha256(seed || n)`; the seed is derived from the goal
/// and workflow identity, and the draw counter is checkpointed, so a
/// resumed engine continues the same sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicIds {
    seed: [u8; 32],
    counter: u64,
}

impl DeterministicIds {
    pub fn for_goal(goal_id: &GoalId, workflow_id: &WorkflowId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(goal_id.as_str().as_bytes());
        hasher.update(b"/");
        hasher.update(workflow_id.as_str().as_bytes());
        Self { seed: hasher.finalize().into(), counter: 0 }
    }

    fn next_digest(&mut self) -> [u8; 32] {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(self.counter.to_be_bytes());
        hasher.finalize().into()
    }

    /// Next UUID in the goal's deterministic sequence.
    pub fn next_uuid(&mut self) -> Uuid {
        let digest = self.next_digest();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        // Sets the version/variant bits so the output is a well-formed
        // (v4-shaped) UUID even though the bytes are derived.
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Next raw 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        let digest = self.next_digest();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(bytes)
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }
}

/// Per-signal execution context handed to the engine and to specs.
///
/// `now_ms` is the engine's monotonic time watermark for the signal
/// being handled; the ID source is shared across the whole engine
/// lifetime.
pub struct ExecContext<'a> {
    now_ms: u64,
    ids: &'a mut DeterministicIds,
}

impl<'a> ExecContext<'a> {
    pub fn new(now_ms: u64, ids: &'a mut DeterministicIds) -> Self {
        Self { now_ms, ids }
    }

    /// Deterministic clock reading for this signal.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Deterministic UUID draw.
    pub fn next_uuid(&mut self) -> Uuid {
        self.ids.next_uuid()
    }

    /// Deterministic random draw.
    pub fn next_u64(&mut self) -> u64 {
        self.ids.next_u64()
    }

    /// Mint a step ID of the form `{workKind}-{uuid}`.
    pub fn mint_step_id(&mut self, work_kind: &str) -> StepId {
        StepId::new(format!("{}-{}", work_kind, self.next_uuid()))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
