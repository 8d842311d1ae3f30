// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified task/response/chunk records (§9: "dynamically-typed task/response
//! dictionaries -> precise record types"). The JSON envelope used on the
//! wire by `stream()` is the only place dynamic typing leaks back in.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

oj_core::define_id! {
    /// Opaque id for one provider-level task execution.
    pub struct TaskId("task-");
}

/// One turn of prior conversation, included as context for the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: String,
    pub content: String,
}

/// A unit of work submitted to a provider's `execute`/`stream`.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub prompt: String,
    pub context: Vec<ContextMessage>,
    pub model: String,
    pub tools: Vec<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Working directory for subprocess-backed providers; ignored by HTTP
    /// providers.
    pub workspace: PathBuf,
    pub env: Vec<(String, String)>,
    pub resume_session: bool,
}

impl Task {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, workspace: PathBuf) -> Self {
        Self {
            id: TaskId::new(),
            prompt: prompt.into(),
            context: Vec::new(),
            model: model.into(),
            tools: Vec::new(),
            timeout: Duration::from_secs(300),
            max_tokens: 4000,
            temperature: 0.0,
            workspace,
            env: Vec::new(),
            resume_session: false,
        }
    }
}

/// Terminal status of one task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Token accounting reported by a backend, when it reports one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Result of a non-streaming `execute()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn completed(content: impl Into<String>) -> Self {
        Self { content: content.into(), status: TaskStatus::Completed, usage: None, metadata: None, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { content: String::new(), status: TaskStatus::Failed, usage: None, metadata: None, error: Some(error.into()) }
    }

    pub fn cancelled() -> Self {
        Self {
            content: String::new(),
            status: TaskStatus::Cancelled,
            usage: None,
            metadata: None,
            error: Some("task cancelled".to_string()),
        }
    }
}

/// One unit of a streamed response. Finite, not restartable; errors are
/// encoded into the final chunk rather than surfaced as a `Result`, per
/// §4.3's `stream()` contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Chunk {
    pub fn data(content: impl Into<String>) -> Self {
        Self { content: content.into(), done: false, status: None, error: None }
    }

    pub fn done(status: TaskStatus) -> Self {
        Self { content: String::new(), done: true, status: Some(status), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            done: true,
            status: Some(TaskStatus::Failed),
            error: Some(error.into()),
        }
    }
}

/// Health snapshot returned by `health_check()`. Never an error -- an
/// unreachable backend is reported as `Unhealthy`, not propagated as `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    Unknown,
}
