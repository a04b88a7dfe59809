// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-dispatch: agents, the dispatcher, and the composition root.
//!
//! The dispatcher is a stateless external reactor: it queries a goal's
//! open steps, runs agents for the WAITING ones, and signals the
//! completions back. The [`Coordinator`] is the composition root
//! holding the spec and agent registries; it is configured in code and
//! read-only once built.

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod dispatcher;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{Agent, AgentContext, AgentExecError, AgentProfile};
pub use config::DispatcherConfig;
pub use coordinator::{
    AgentFactory, Coordinator, CoordinatorBuilder, FnAgentFactory, FnSpecFactory, SpecFactory,
    StartGoal,
};
pub use dispatcher::{Dispatcher, TickSummary};
