// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

fn envelope(status: ResponseStatus) -> AgentResponse {
    AgentResponse::new(
        GoalId::new("g1"),
        WorkflowId::from_string("wfl-1"),
        StepId::new("GREET-1"),
        RunId::from_string("run-1"),
        status,
    )
}

#[yare::parameterized(
    ok      = { ResponseStatus::Ok, "\"OK\"" },
    partial = { ResponseStatus::Partial, "\"PARTIAL\"" },
    fail    = { ResponseStatus::Fail, "\"FAIL\"" },
)]
fn status_wire_format(status: ResponseStatus, wire: &str) {
    assert_eq!(serde_json::to_string(&status).unwrap(), wire);
    let parsed: ResponseStatus = serde_json::from_str(wire).unwrap();
    assert_eq!(parsed, status);
}

#[test]
fn minimal_envelope_omits_empty_collections() {
    let resp = envelope(ResponseStatus::Ok);
    let json = serde_json::to_string(&resp).unwrap();
    assert!(!json.contains("artifacts"));
    assert!(!json.contains("metrics"));
    assert!(!json.contains("errors"));
    assert!(!json.contains("content"));
    let parsed: AgentResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, resp);
}

#[test]
fn chained_setters_accumulate() {
    let resp = envelope(ResponseStatus::Partial)
        .agent_role("writer")
        .content("half done")
        .artifact(ArtifactEntry::new("FILE").ref_id("readme").url("file:///README.md"))
        .metric("tokens", 1234)
        .error(ResponseError::new("context window").code("E_CTX"));

    assert_eq!(resp.agent_role, "writer");
    assert_eq!(resp.content.as_deref(), Some("half done"));
    assert_eq!(resp.artifacts.len(), 1);
    assert_eq!(resp.metrics.get("tokens"), Some(&json!(1234)));
    assert_eq!(resp.errors[0].code.as_deref(), Some("E_CTX"));
}

#[test]
fn artifact_entry_renames_type_and_ref() {
    let entry = ArtifactEntry::new("FILE").ref_id("readme");
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json, json!({"type": "FILE", "ref": "readme"}));
}

#[test]
fn status_predicates() {
    assert!(envelope(ResponseStatus::Ok).is_ok());
    assert!(envelope(ResponseStatus::Fail).is_fail());
    assert!(!envelope(ResponseStatus::Partial).is_ok());
}

#[test]
fn run_id_mints_prefixed_inline_ids() {
    let id = RunId::new();
    assert!(id.as_str().starts_with(RunId::PREFIX));
    assert_eq!(id.as_str().len(), 23);
    assert_ne!(id, RunId::new());
}

#[test]
fn run_id_rebuilds_from_recorded_string() {
    let id = RunId::from_string("run-recorded");
    assert_eq!(id, "run-recorded");
    assert_eq!(id.to_string(), "run-recorded");
}
