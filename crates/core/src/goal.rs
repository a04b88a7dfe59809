// SPDX-License-Identifier: MIT

//! Goal and workflow identity.
//!
//! A goal is the top-level intent a single engine instance drives to
//! completion. `GoalId` is supplied by the caller and opaque to the
//! core; `WorkflowId` names the engine instance hosting the goal and is
//! minted by the durable host at start.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

/// Identity of the durable engine instance hosting one goal.
///
/// A goal has exactly one engine instance at a time. The host mints
/// this ID once at start and records it in the goal's write-ahead log,
/// so replay and recovery see the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(SmolStr);

impl WorkflowId {
    pub const PREFIX: &'static str = "wfl-";

    /// Mint a fresh workflow identity.
    pub fn new() -> Self {
        Self(crate::id::mint(Self::PREFIX))
    }

    /// Rebuild from a recorded identity (WAL or snapshot).
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for WorkflowId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for WorkflowId {
    fn from(s: String) -> Self {
        Self(SmolStr::new(&s))
    }
}

impl Borrow<str> for WorkflowId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<str> for WorkflowId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WorkflowId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Caller-supplied identifier for a goal. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(SmolStr);

impl GoalId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for GoalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for GoalId {
    fn from(s: String) -> Self {
        Self(SmolStr::new(&s))
    }
}

impl Borrow<str> for GoalId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<str> for GoalId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for GoalId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "goal_tests.rs"]
mod tests;
