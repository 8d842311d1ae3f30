// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent event envelope (§4.7 of the design).
//!
//! Events flow from a provider's subprocess/HTTP output, through the
//! monitor, into the agent's bounded event queue. The finite event-type set
//! mirrors the original `EventType` enum: `ToolCall`, `Edit`, `Log`,
//! `StatusChange`, `TaskStart`, `TaskComplete`, `Error`.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The finite set of event types a monitor can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ToolCall,
    Edit,
    Log,
    StatusChange,
    TaskStart,
    TaskComplete,
    Error,
}

impl EventType {
    /// Terminal event types close out a run: exactly one must be last.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TaskComplete | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolCall => "tool_call",
            Self::Edit => "edit",
            Self::Log => "log",
            Self::StatusChange => "status_change",
            Self::TaskStart => "task_start",
            Self::TaskComplete => "task_complete",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a raw JSON output line into an event type, falling back to `Log`
/// for anything that doesn't name a recognised `type` field — matching the
/// original adapter's "not JSON, or unknown type → log line" behavior.
impl std::str::FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tool_call" => Ok(Self::ToolCall),
            "edit" => Ok(Self::Edit),
            "log" => Ok(Self::Log),
            "status_change" => Ok(Self::StatusChange),
            "task_start" => Ok(Self::TaskStart),
            "task_complete" => Ok(Self::TaskComplete),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

/// A single event in an agent's queue.
///
/// `run_id` is `None` for events not scoped to a run (e.g. agent-level
/// `StatusChange` on creation/disposal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: String,
    pub agent_id: AgentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub payload: Value,
}

impl Event {
    pub fn new(
        event_type: EventType,
        agent_id: AgentId,
        run_id: Option<String>,
        payload: Value,
        timestamp: String,
    ) -> Self {
        Self { event_type, timestamp, agent_id, run_id, payload }
    }

    /// Wire id per §4.7: `"<agent_id>-<timestamp>"`. Monotonic within an
    /// agent because timestamps are monotonic per agent.
    pub fn wire_id(&self) -> String {
        format!("{}-{}", self.agent_id, self.timestamp)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
