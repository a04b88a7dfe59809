// SPDX-License-Identifier: MIT

//! Composition root: spec and agent registries plus kind routing.
//!
//! Registration happens once, in code, before any goal starts; the
//! built [`Coordinator`] is read-only. The spec for a goal is resolved
//! here at start time and the instance is handed to the engine: no
//! global registry, no name lookups from workflow code.

use crate::agent::Agent;
use muster_core::{Clock, EngineDecision, GoalId};
use muster_engine::Spec;
use muster_runtime::{EngineHandle, Runtime, RuntimeError};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds spec instances for goals.
pub trait SpecFactory: Send + Sync {
    fn name(&self) -> &str;
    fn build(&self, goal_id: &GoalId) -> Arc<dyn Spec>;
}

/// Builds agent instances.
pub trait AgentFactory: Send + Sync {
    fn name(&self) -> &str;
    fn build(&self) -> Arc<dyn Agent>;
}

/// Closure-backed [`SpecFactory`].
pub struct FnSpecFactory {
    name: String,
    build: Box<dyn Fn(&GoalId) -> Arc<dyn Spec> + Send + Sync>,
}

impl FnSpecFactory {
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&GoalId) -> Arc<dyn Spec> + Send + Sync + 'static,
    {
        Self { name: name.into(), build: Box::new(build) }
    }
}

impl SpecFactory for FnSpecFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self, goal_id: &GoalId) -> Arc<dyn Spec> {
        (self.build)(goal_id)
    }
}

/// Closure-backed [`AgentFactory`].
pub struct FnAgentFactory {
    name: String,
    build: Box<dyn Fn() -> Arc<dyn Agent> + Send + Sync>,
}

impl FnAgentFactory {
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        Self { name: name.into(), build: Box::new(build) }
    }
}

impl AgentFactory for FnAgentFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self) -> Arc<dyn Agent> {
        (self.build)()
    }
}

/// Start-goal request.
#[derive(Clone)]
pub struct StartGoal {
    pub goal_id: GoalId,
    pub spec_name: String,
    pub boot_decision: Option<EngineDecision>,
}

impl StartGoal {
    pub fn new(goal_id: impl Into<GoalId>, spec_name: impl Into<String>) -> Self {
        Self { goal_id: goal_id.into(), spec_name: spec_name.into(), boot_decision: None }
    }

    muster_core::setters! {
        option { boot_decision: EngineDecision }
    }
}

/// Builder for [`Coordinator`]. Registration order is irrelevant;
/// later registrations under the same name win.
#[derive(Default)]
pub struct CoordinatorBuilder {
    specs: HashMap<String, Arc<dyn SpecFactory>>,
    agents: HashMap<String, Arc<dyn AgentFactory>>,
    routes: HashMap<String, String>,
}

impl CoordinatorBuilder {
    pub fn register_spec(mut self, factory: Arc<dyn SpecFactory>) -> Self {
        self.specs.insert(factory.name().to_string(), factory);
        self
    }

    pub fn register_agent(mut self, factory: Arc<dyn AgentFactory>) -> Self {
        self.agents.insert(factory.name().to_string(), factory);
        self
    }

    /// Route a work kind to a registered agent.
    pub fn route(mut self, kind: impl Into<String>, agent_name: impl Into<String>) -> Self {
        self.routes.insert(kind.into(), agent_name.into());
        self
    }

    pub fn build(self) -> Coordinator {
        Coordinator { specs: self.specs, agents: self.agents, routes: self.routes }
    }
}

/// Read-only registries wiring specs and agents to goals.
pub struct Coordinator {
    specs: HashMap<String, Arc<dyn SpecFactory>>,
    agents: HashMap<String, Arc<dyn AgentFactory>>,
    routes: HashMap<String, String>,
}

impl Coordinator {
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Build a spec instance for a goal, or `None` for an unknown name.
    pub fn resolve_spec(&self, name: &str, goal_id: &GoalId) -> Option<Arc<dyn Spec>> {
        self.specs.get(name).map(|factory| factory.build(goal_id))
    }

    /// Agent instance routed for a work kind, or `None` when the kind
    /// has no route (the step stays WAITING).
    pub fn agent_for_kind(&self, kind: &str) -> Option<Arc<dyn Agent>> {
        let agent_name = self.routes.get(kind)?;
        match self.agents.get(agent_name) {
            Some(factory) => Some(factory.build()),
            None => {
                tracing::warn!(kind, agent = %agent_name, "route names an unregistered agent");
                None
            }
        }
    }

    /// Start a goal: resolve the spec and hand the instance to the
    /// durable host. An unknown spec name starts a FAILED tombstone
    /// engine so the failure is queryable like any other goal.
    pub fn start_goal<C: Clock>(
        &self,
        runtime: &Runtime<C>,
        request: StartGoal,
    ) -> Result<EngineHandle, RuntimeError> {
        match self.resolve_spec(&request.spec_name, &request.goal_id) {
            Some(spec) => runtime.start(request.goal_id, spec, request.boot_decision),
            None => {
                tracing::error!(
                    goal = %request.goal_id,
                    spec = %request.spec_name,
                    "spec not registered; starting failed goal"
                );
                runtime.start_failed(request.goal_id, &request.spec_name)
            }
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
