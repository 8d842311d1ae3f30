// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/agents*` routes: the transport-facing half of C6's eight operations.
//! Every numeric task option is clamped here, once, before it reaches the
//! manager -- the manager itself trusts whatever `AgentConfig`/`TaskOptions`
//! it's handed.

use crate::clamp::{clamp_max_tokens, clamp_temperature, clamp_timeout_secs};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use oj_core::{AgentConfig, AgentId, AgentInfo, RunId, TaskOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub workspace_path: std::path::PathBuf,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

fn default_timeout_secs() -> u32 {
    300
}

fn default_max_tokens() -> u32 {
    4000
}

#[derive(Debug, Serialize)]
pub struct CreateAgentResponse {
    pub agent_id: AgentId,
}

/// `POST /agents`.
pub async fn create_agent(
    State(state): State<AppState>,
    Json(req): Json<CreateAgentRequest>,
) -> Result<Json<CreateAgentResponse>, ApiError> {
    if req.provider.trim().is_empty() {
        return Err(ApiError::validation("provider must not be empty"));
    }
    let config = AgentConfig {
        workspace_path: req.workspace_path,
        provider: req.provider,
        model: req.model,
        allowed_tools: req.allowed_tools,
        timeout_secs: clamp_timeout_secs(req.timeout_secs),
        max_tokens: clamp_max_tokens(req.max_tokens),
        temperature: clamp_temperature(req.temperature),
    };
    let agent_id = state.manager.create_agent(config)?;
    Ok(Json(CreateAgentResponse { agent_id }))
}

/// `GET /agents`.
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentInfo>> {
    Json(state.manager.list_agents())
}

/// `GET /agents/:id`.
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentInfo>, ApiError> {
    let info = state.manager.get_status(&AgentId::from_string(id))?;
    Ok(Json(info))
}

/// `DELETE /agents/:id`.
pub async fn dispose_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let disposed = state.manager.dispose_agent(&AgentId::from_string(id)).await?;
    Ok(Json(json!({"disposed": disposed})))
}

#[derive(Debug, Deserialize)]
pub struct RunTaskRequest {
    pub prompt: String,
    #[serde(default)]
    pub tools: Option<Vec<String>>,
    #[serde(default)]
    pub timeout_secs: Option<u32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub resume_session: bool,
}

#[derive(Debug, Serialize)]
pub struct RunTaskResponse {
    pub run_id: RunId,
}

/// `POST /agents/:id/tasks`.
pub async fn run_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RunTaskRequest>,
) -> Result<Json<RunTaskResponse>, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::validation("prompt must not be empty"));
    }
    let options = TaskOptions {
        tools: req.tools,
        timeout_secs: req.timeout_secs.map(clamp_timeout_secs),
        max_tokens: req.max_tokens.map(clamp_max_tokens),
        temperature: req.temperature.map(clamp_temperature),
        resume_session: req.resume_session,
    };
    let run_id = state.manager.run_task(&AgentId::from_string(id), req.prompt, options).await?;
    Ok(Json(RunTaskResponse { run_id }))
}

/// `POST /agents/:id/cancel/:run_id`.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path((id, run_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let cancelled = state
        .manager
        .cancel_task(&AgentId::from_string(id), &RunId::from_string(run_id))
        .await?;
    Ok(Json(json!({"cancelled": cancelled})))
}

