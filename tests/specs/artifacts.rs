// SPDX-License-Identifier: MIT

//! Artifact auto-indexing from agent responses.

use super::prelude::*;

fn idle_policy(
    _state: &EngineState,
    _response: &AgentResponse,
    _ctx: &mut ExecContext<'_>,
) -> Result<EngineDecision, SpecError> {
    Ok(EngineDecision::new("idle"))
}

fn file_agent() -> Arc<dyn muster_dispatch::AgentFactory> {
    Arc::new(FnAgentFactory::new("archivist", || {
        Arc::new(FnAgent::new(AgentProfile::new("archivist").kind("X"), |_, _, ctx| {
            Ok(ctx
                .ok()
                .artifact(ArtifactEntry::new("FILE").ref_id("readme").url("file:///README.md"))
                .artifact(ArtifactEntry::new("TRACE")))
        })) as Arc<dyn Agent>
    }))
}

#[tokio::test]
async fn response_artifacts_are_indexed_by_type_and_ref() {
    let harness = Harness::new(
        Coordinator::builder()
            .register_spec(policy("indexing", idle_policy))
            .register_agent(file_agent())
            .route("X", "archivist"),
    );
    let handle =
        harness.start(StartGoal::new("artifacts-1", "indexing").boot_decision(boot("X", "X-1")));

    harness.dispatcher.tick(&handle).await;
    handle.drained().await;

    let state = handle.current_state();
    let entry = state.artifacts.get("FILE:readme").expect("ref-keyed artifact");
    assert_eq!(entry["type"], "FILE");
    assert_eq!(entry["ref"], "readme");
    assert_eq!(entry["url"], "file:///README.md");

    // The ref-less TRACE artifact got a fresh uuid key.
    assert!(state.artifacts.keys().any(|k| k.starts_with("TRACE:")));
}

#[tokio::test]
async fn annotate_actions_overwrite_artifact_keys() {
    let harness = Harness::new(
        Coordinator::builder()
            .register_spec(policy("indexing", idle_policy))
            .register_agent(file_agent())
            .route("X", "archivist"),
    );
    let handle =
        harness.start(StartGoal::new("artifacts-2", "indexing").boot_decision(boot("X", "X-1")));

    handle
        .apply_decision(
            EngineDecision::new("note-1").action(EngineAction::annotate("note", "first")),
        )
        .await
        .unwrap();
    handle
        .apply_decision(
            EngineDecision::new("note-2").action(EngineAction::annotate("note", "second")),
        )
        .await
        .unwrap();
    handle.drained().await;

    assert_eq!(
        handle.current_state().artifacts.get("note"),
        Some(&serde_json::json!("second"))
    );
}
