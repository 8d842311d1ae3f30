// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ai-providers*` routes: the management surface over [`ProviderRegistry`]
//! (C5), letting an operator register a backend and run one-shot tasks
//! directly against a provider kind without first creating an agent.

use crate::clamp::{clamp_max_tokens, clamp_temperature, clamp_timeout_secs};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use oj_providers::{
    HttpProvider, ProviderConfig, ProviderKind, SubprocessProvider, Task as ProviderTask,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// `POST /ai-providers/register`: builds the right provider implementation
/// for the config's tag and swaps it into the shared registry. Replaces
/// any prior registration for the same kind; the new instance starts
/// uninitialized until the next `initialize_all` sweep or direct task.
pub async fn register_provider(
    State(state): State<AppState>,
    Json(config): Json<ProviderConfig>,
) -> Result<Json<Value>, ApiError> {
    let kind = config.kind();
    let provider: Arc<dyn oj_providers::Provider> = match config {
        ProviderConfig::ClaudeCode(c) => Arc::new(SubprocessProvider::new(ProviderKind::ClaudeCode, c)),
        ProviderConfig::GeminiCode(c) => Arc::new(SubprocessProvider::new(ProviderKind::GeminiCode, c)),
        ProviderConfig::Ollama(c) => Arc::new(HttpProvider::new(ProviderKind::Ollama, c)),
        ProviderConfig::OpenAi(c) => Arc::new(HttpProvider::new(ProviderKind::OpenAi, c)),
        ProviderConfig::Gemini(c) => Arc::new(HttpProvider::new(ProviderKind::Gemini, c)),
    };
    state.providers.register(provider.clone());
    if let Err(e) = provider.initialize().await {
        return Err(ApiError::validation(format!("provider registered but failed to initialize: {e}")));
    }
    tracing::info!(kind = %kind, "provider registered");
    Ok(Json(json!({"kind": kind, "registered": true})))
}

#[derive(Debug, Serialize)]
pub struct ProviderInfoView {
    pub initialized: bool,
    pub status: String,
    pub models: Vec<String>,
    /// Required config keys, under the name the management surface uses
    /// for "what does this provider's config need to look like".
    pub schema: Vec<&'static str>,
}

/// `GET /ai-providers`: per-kind snapshot for every registered backend.
pub async fn list_providers(State(state): State<AppState>) -> Json<HashMap<String, ProviderInfoView>> {
    let info = state.providers.providers_info().await;
    let view = info
        .into_iter()
        .map(|(kind, i)| {
            (
                kind.to_string(),
                ProviderInfoView {
                    initialized: i.initialized,
                    status: health_state_str(i.status.status).to_string(),
                    models: i.models,
                    schema: i.required_config_keys,
                },
            )
        })
        .collect();
    Json(view)
}

#[derive(Debug, Deserialize)]
pub struct ProviderTaskRequest {
    pub kind: String,
    pub prompt: String,
    pub model: String,
    #[serde(default)]
    pub workspace_path: Option<PathBuf>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    /// When set, the response is a chunked SSE stream of
    /// [`oj_providers::Chunk`]s instead of one JSON `Response` body, per
    /// §6's "one-shot execute (stream or not)".
    #[serde(default)]
    pub stream: bool,
}

fn health_state_str(state: oj_providers::HealthState) -> &'static str {
    match state {
        oj_providers::HealthState::Healthy => "healthy",
        oj_providers::HealthState::Unhealthy => "unhealthy",
        oj_providers::HealthState::Unknown => "unknown",
    }
}

fn default_timeout_secs() -> u32 {
    300
}

fn default_max_tokens() -> u32 {
    4000
}

/// `POST /ai-providers/tasks`: runs one task directly against a provider
/// kind, bypassing the agent pool entirely -- no sandbox, no policy check,
/// no event queue. Intended for health-checking a backend or quick
/// one-shot prompts, not for anything the agent lifecycle should track.
pub async fn run_provider_task(
    State(state): State<AppState>,
    Json(req): Json<ProviderTaskRequest>,
) -> Result<Response, ApiError> {
    let kind: ProviderKind = req.kind.parse().map_err(ApiError::validation)?;
    let workspace = req.workspace_path.unwrap_or_else(std::env::temp_dir);
    let stream = req.stream;
    let mut task = ProviderTask::new(req.prompt, req.model, workspace);
    task.tools = req.tools;
    task.timeout = Duration::from_secs(clamp_timeout_secs(req.timeout_secs) as u64);
    task.max_tokens = clamp_max_tokens(req.max_tokens);
    task.temperature = clamp_temperature(req.temperature);

    if stream {
        let chunks = state.providers.stream(kind, task).await;
        let sse = chunks.map(|chunk| {
            let data = serde_json::to_string(&chunk).unwrap_or_else(|_| "{}".to_string());
            Ok::<_, std::convert::Infallible>(SseEvent::default().data(data))
        });
        return Ok(Sse::new(sse).keep_alive(KeepAlive::default()).into_response());
    }

    let response = state.providers.execute(kind, task).await?;
    Ok(Json(response).into_response())
}

