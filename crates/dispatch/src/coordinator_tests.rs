// SPDX-License-Identifier: MIT

use super::*;
use crate::test_support::ScriptedAgent;
use muster_core::test_support::boot_work;
use muster_core::{EngineEvent, EngineStatus};
use muster_engine::test_support::StubSpec;
use muster_engine::Spec;
use muster_runtime::RuntimeConfig;
use tempfile::TempDir;

fn coordinator() -> Coordinator {
    Coordinator::builder()
        .register_spec(Arc::new(FnSpecFactory::new("hello", |_| {
            Arc::new(StubSpec::finalizing("hello")) as Arc<dyn Spec>
        })))
        .register_agent(Arc::new(FnAgentFactory::new("greeter", || {
            Arc::new(ScriptedAgent::new("greeter")) as Arc<dyn Agent>
        })))
        .route("GREET", "greeter")
        .route("DANGLING", "nobody")
        .build()
}

#[test]
fn resolves_registered_spec() {
    let coordinator = coordinator();
    let spec = coordinator.resolve_spec("hello", &GoalId::new("g1"));
    assert_eq!(spec.map(|s| s.name().to_string()), Some("hello".to_string()));
}

#[test]
fn unknown_spec_resolves_to_none() {
    assert!(coordinator().resolve_spec("ghost", &GoalId::new("g1")).is_none());
}

#[test]
fn routes_kind_to_agent() {
    let agent = coordinator().agent_for_kind("GREET").unwrap();
    assert_eq!(agent.describe().name, "greeter");
}

#[test]
fn unrouted_kind_has_no_agent() {
    assert!(coordinator().agent_for_kind("UNKNOWN").is_none());
}

#[test]
fn route_to_unregistered_agent_has_no_agent() {
    assert!(coordinator().agent_for_kind("DANGLING").is_none());
}

#[tokio::test]
async fn start_goal_resolves_spec_and_boots() {
    let dir = TempDir::new().unwrap();
    let runtime = muster_runtime::Runtime::new(RuntimeConfig::new(dir.path()));

    let handle = coordinator()
        .start_goal(
            &runtime,
            StartGoal::new("g1", "hello").boot_decision(boot_work("GREET", "g1-step")),
        )
        .unwrap();

    assert_eq!(handle.status(), EngineStatus::Running);
    assert!(handle.current_state().step("g1-step").is_some());
}

#[tokio::test]
async fn start_goal_with_unknown_spec_starts_failed_tombstone() {
    let dir = TempDir::new().unwrap();
    let runtime = muster_runtime::Runtime::new(RuntimeConfig::new(dir.path()));

    let handle =
        coordinator().start_goal(&runtime, StartGoal::new("g1", "ghost")).unwrap();

    let state = handle.current_state();
    assert_eq!(state.status, EngineStatus::Failed);
    assert!(matches!(
        state.last_event(),
        Some(EngineEvent::UnknownSpec { spec }) if spec == "ghost"
    ));
}
