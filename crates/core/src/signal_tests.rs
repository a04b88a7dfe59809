// SPDX-License-Identifier: MIT

use super::*;
use crate::test_support::ok_response;
use serde_json::json;

#[test]
fn signal_wire_tags() {
    let approve = EngineSignal::Approve { step_id: "ap1".into() };
    let value = serde_json::to_value(&approve).unwrap();
    assert_eq!(value, json!({"signal": "approval:grant", "step_id": "ap1"}));

    let cancel = EngineSignal::Cancel { reason: "user".into() };
    assert_eq!(
        serde_json::to_value(&cancel).unwrap(),
        json!({"signal": "goal:cancel", "reason": "user"})
    );
}

#[test]
fn custom_signal_omits_null_payload() {
    let custom = EngineSignal::Custom { event_type: "gateCleared".into(), payload: Value::Null };
    let json = serde_json::to_string(&custom).unwrap();
    assert!(!json.contains("payload"));
    let parsed: EngineSignal = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, custom);
}

#[test]
fn agent_completed_roundtrip() {
    let signal = EngineSignal::AgentCompleted {
        step_id: "GREET-1".into(),
        response: ok_response("GREET-1"),
    };
    let json = serde_json::to_string(&signal).unwrap();
    let parsed: EngineSignal = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, signal);
}

#[yare::parameterized(
    completed = { EngineSignal::AgentCompleted { step_id: "s".into(), response: ok_response("s") }, "agent_completed" },
    decision  = { EngineSignal::ApplyDecision { decision: EngineDecision::new("d") }, "apply_decision" },
    approve   = { EngineSignal::Approve { step_id: "s".into() }, "approve" },
    cancel    = { EngineSignal::Cancel { reason: String::new() }, "cancel" },
    custom    = { EngineSignal::Custom { event_type: "x".into(), payload: Value::Null }, "custom" },
)]
fn signal_names(signal: EngineSignal, name: &str) {
    assert_eq!(signal.name(), name);
}

#[test]
fn fields_cover_identifying_info() {
    let signal = EngineSignal::AgentCompleted {
        step_id: "GREET-1".into(),
        response: ok_response("GREET-1"),
    };
    let fields = signal.fields();
    assert!(fields.iter().any(|(k, v)| *k == "step_id" && v == "GREET-1"));
    assert!(fields.iter().any(|(k, _)| *k == "status"));
}
