// SPDX-License-Identifier: MIT

//! Shared harness for the workspace specs.

pub use muster_core::{
    AgentResponse, ArtifactEntry, EngineAction, EngineDecision, EngineEvent, EngineState,
    EngineStatus, FakeClock, GoalId, ResponseStatus, StepStatus,
};
pub use muster_dispatch::test_support::{FnAgent, ScriptedAgent};
pub use muster_dispatch::{
    Agent, AgentProfile, Coordinator, CoordinatorBuilder, Dispatcher, DispatcherConfig,
    FnAgentFactory, FnSpecFactory, SpecFactory, StartGoal,
};
pub use muster_engine::test_support::StubSpec;
pub use muster_engine::{ExecContext, Spec, SpecError};
pub use muster_runtime::{EngineHandle, Runtime, RuntimeConfig};
pub use std::sync::Arc;
pub use std::time::Duration;

use tempfile::TempDir;

/// Policy callback shape for simple fn-pointer specs.
pub type Policy = fn(
    &EngineState,
    &AgentResponse,
    &mut ExecContext<'_>,
) -> Result<EngineDecision, SpecError>;

pub type CustomPolicy =
    fn(&EngineState, &str, &serde_json::Value) -> Result<Option<EngineDecision>, SpecError>;

/// Spec factory from a fn-pointer policy.
pub fn policy(name: &'static str, on_completed: Policy) -> Arc<dyn SpecFactory> {
    Arc::new(FnSpecFactory::new(name, move |_| {
        Arc::new(StubSpec::new(name, on_completed)) as Arc<dyn Spec>
    }))
}

/// Spec factory with a custom-event handler as well.
pub fn policy_with_custom(
    name: &'static str,
    on_completed: Policy,
    on_custom: CustomPolicy,
) -> Arc<dyn SpecFactory> {
    Arc::new(FnSpecFactory::new(name, move |_| {
        Arc::new(StubSpec::new(name, on_completed).with_custom(on_custom)) as Arc<dyn Spec>
    }))
}

/// Agent factory producing OK-answering scripted agents.
pub fn ok_agent(name: &'static str) -> Arc<dyn muster_dispatch::AgentFactory> {
    Arc::new(FnAgentFactory::new(name, move || {
        Arc::new(ScriptedAgent::new(name)) as Arc<dyn Agent>
    }))
}

/// Full-stack fixture: one runtime, one coordinator, one dispatcher,
/// all on a fake clock over a temp state directory.
pub struct Harness {
    _dir: TempDir,
    pub clock: FakeClock,
    pub runtime: Runtime<FakeClock>,
    pub coordinator: Arc<Coordinator>,
    pub dispatcher: Dispatcher<FakeClock>,
}

impl Harness {
    pub fn new(builder: CoordinatorBuilder) -> Self {
        let dir = TempDir::new().expect("temp state dir");
        let clock = FakeClock::new();
        let runtime = Runtime::with_clock(RuntimeConfig::new(dir.path()), clock.clone());
        let coordinator = Arc::new(builder.build());
        let dispatcher = Dispatcher::with_clock(
            coordinator.clone(),
            DispatcherConfig::default().poll_interval(Duration::from_millis(5)),
            clock.clone(),
        );
        Self { _dir: dir, clock, runtime, coordinator, dispatcher }
    }

    pub fn start(&self, request: StartGoal) -> EngineHandle {
        self.coordinator.start_goal(&self.runtime, request).expect("start goal")
    }
}

/// Boot decision opening one explicitly named step.
pub fn boot(kind: &str, step_id: &str) -> EngineDecision {
    EngineDecision::new("boot").action(EngineAction::request_work_as(kind, step_id))
}
