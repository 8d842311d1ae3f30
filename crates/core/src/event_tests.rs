// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentId;
use serde_json::json;

#[test]
fn terminal_events_are_task_complete_and_error() {
    assert!(EventType::TaskComplete.is_terminal());
    assert!(EventType::Error.is_terminal());
    assert!(!EventType::Log.is_terminal());
    assert!(!EventType::TaskStart.is_terminal());
}

#[test]
fn wire_id_combines_agent_and_timestamp() {
    let event = Event::new(
        EventType::Log,
        AgentId::from_string("agent-abc"),
        None,
        json!({"message": "hi"}),
        "2026-07-28T00:00:00Z".to_string(),
    );
    assert_eq!(event.wire_id(), "agent-abc-2026-07-28T00:00:00Z");
}

#[test]
fn event_type_from_str_roundtrips_known_variants() {
    use std::str::FromStr;
    assert_eq!(EventType::from_str("task_start"), Ok(EventType::TaskStart));
    assert_eq!(EventType::from_str("bogus"), Err(()));
}

#[test]
fn event_serializes_run_id_only_when_present() {
    let event = Event::new(
        EventType::StatusChange,
        AgentId::from_string("agent-abc"),
        None,
        json!({}),
        "t".to_string(),
    );
    let value = serde_json::to_value(&event).unwrap();
    assert!(value.get("run_id").is_none());
}
