// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity, configuration, and lifecycle state (§3, §4.6).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Opaque agent identifier, unique within a process lifetime.
    pub struct AgentId("agent-");
}

crate::define_id! {
    /// Opaque run identifier, unique per task execution, scoped to one agent.
    pub struct RunId("run-");
}

/// Immutable-after-create agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub workspace_path: PathBuf,
    /// Provider kind this agent dispatches to, by name (e.g. `"claude_code"`,
    /// `"openai"`). Kept as an opaque string here rather than an enum so
    /// `oj-core` stays a leaf crate with no dependency on `oj-providers`;
    /// the pool validates it against a registered [`oj_providers::ProviderKind`].
    pub provider: String,
    pub model: String,
    pub allowed_tools: Vec<String>,
    /// Wall-clock task timeout in seconds, clamped to `[30, 3600]` by the transport.
    pub timeout_secs: u32,
    /// Token ceiling, clamped to `[100, 32000]` by the transport.
    pub max_tokens: u32,
    /// Sampling temperature, clamped to `[0.0, 1.0]` by the transport.
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace_path: PathBuf::new(),
            provider: "claude_code".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            allowed_tools: vec!["Read".to_string(), "Edit".to_string(), "Bash".to_string()],
            timeout_secs: 300,
            max_tokens: 4000,
            temperature: 0.0,
        }
    }
}

/// Per-run override merged with [`AgentConfig`] (options take precedence).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub resume_session: bool,
}

/// Options actually used for one run, after merging with agent config.
#[derive(Debug, Clone)]
pub struct EffectiveOptions {
    pub tools: Vec<String>,
    pub timeout_secs: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    pub resume_session: bool,
}

impl TaskOptions {
    /// Merge with the owning agent's config; options take precedence.
    pub fn merge_with_config(&self, config: &AgentConfig) -> EffectiveOptions {
        EffectiveOptions {
            tools: self.tools.clone().unwrap_or_else(|| config.allowed_tools.clone()),
            timeout_secs: self.timeout_secs.unwrap_or(config.timeout_secs),
            max_tokens: self.max_tokens.unwrap_or(config.max_tokens),
            temperature: self.temperature.unwrap_or(config.temperature),
            resume_session: self.resume_session,
        }
    }
}

/// Lifecycle state of an agent (see the state machine in §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Created,
    Running,
    Idle,
    Error,
    Disposed,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Idle => "idle",
            Self::Error => "error",
            Self::Disposed => "disposed",
        };
        f.write_str(s)
    }
}

/// A read-only snapshot of an agent, returned by `get_status`/`list_agents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: AgentId,
    pub config: AgentConfig,
    pub status: AgentStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_run_id: Option<RunId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
