// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-engine: the durable goal state machine and its policy seam.
//!
//! [`EngineWorkflow`] owns one goal's state and applies signals one at
//! a time; after each agent completion it consults the goal's [`Spec`]
//! for a decision and applies the returned actions. All time and ID
//! reads go through [`ExecContext`], so a replayed signal sequence
//! reproduces the exact same state.

pub mod context;
pub mod spec;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use context::{DeterministicIds, ExecContext};
pub use spec::{ArtifactView, Spec, SpecError};
pub use workflow::EngineWorkflow;
