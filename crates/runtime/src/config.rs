// SPDX-License-Identifier: MIT

//! Host configuration.

use muster_core::GoalId;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Root state directory; each goal lives under `goals/{goal_id}/`.
    pub state_dir: PathBuf,
    /// Signals between checkpoints.
    pub checkpoint_interval: u64,
    /// Periodic park wake for compaction. Nothing observable to the
    /// spec happens on a wake.
    pub park_wake: Duration,
    /// Bound the in-state log to this many entries at checkpoint time.
    /// The discarded prefix survives in the snapshot chain.
    pub log_tail: Option<usize>,
    /// Signal mailbox depth per goal.
    pub mailbox_capacity: usize,
}

impl RuntimeConfig {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            checkpoint_interval: 64,
            park_wake: Duration::from_secs(7 * 24 * 60 * 60),
            log_tail: None,
            mailbox_capacity: 256,
        }
    }

    muster_core::setters! {
        set {
            checkpoint_interval: u64,
            park_wake: Duration,
            mailbox_capacity: usize,
        }
        option {
            log_tail: usize,
        }
    }

    pub(crate) fn goal_dir(&self, goal_id: &GoalId) -> PathBuf {
        // Goal IDs are opaque caller strings; keep them path-safe.
        let safe: String = goal_id
            .as_str()
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
            .collect();
        self.state_dir.join("goals").join(safe)
    }

    pub(crate) fn wal_path(&self, goal_id: &GoalId) -> PathBuf {
        self.goal_dir(goal_id).join("signals.wal")
    }

    pub(crate) fn snapshot_path(&self, goal_id: &GoalId) -> PathBuf {
        self.goal_dir(goal_id).join("snapshot.bin")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
