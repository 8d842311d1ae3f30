// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archetype B: HTTP-backed providers (remote chat API), per §4.4.
//!
//! Holds a pooled `reqwest::Client` (connection reuse, per-request
//! timeout). Non-streaming `execute` issues one request and decodes the
//! response into the unified [`Response`] shape. Streaming opens a
//! chunked/SSE response and parses each event with `eventsource-stream`,
//! terminating on the `[DONE]` sentinel or the backend's own completion
//! field. Cancellation aborts the underlying request task.

use crate::error::ProviderError;
use crate::kind::{HttpConfig, ProviderKind};
use crate::model::{Chunk, ContextMessage, HealthState, HealthStatus, Response, Task, TaskId, TaskStatus, Usage};
use crate::provider::{ChunkStream, Provider};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_stream::wrappers::ReceiverStream;

const EVENT_QUEUE_CAPACITY: usize = 1024;
const DONE_SENTINEL: &str = "[DONE]";

/// HTTP-backed provider for a remote or local-server chat API (OpenAI,
/// Gemini, Ollama).
pub struct HttpProvider {
    kind: ProviderKind,
    config: HttpConfig,
    client: reqwest::Client,
    live: Arc<Mutex<HashMap<TaskId, AbortHandle>>>,
}

impl HttpProvider {
    pub fn new(kind: ProviderKind, config: HttpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { kind, config, client, live: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(task: &Task, stream: bool) -> serde_json::Value {
        let mut messages: Vec<serde_json::Value> = task
            .context
            .iter()
            .map(|m: &ContextMessage| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();
        messages.push(serde_json::json!({"role": "user", "content": task.prompt}));
        serde_json::json!({
            "model": task.model,
            "messages": messages,
            "max_tokens": task.max_tokens,
            "temperature": task.temperature,
            "stream": stream,
        })
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn required_config_keys(&self) -> &'static [&'static str] {
        &["base_url"]
    }

    /// Hardcoded fallback ids, recovered from the original Ollama/OpenAI
    /// provider sources' shipped model lists.
    fn available_models(&self) -> Vec<String> {
        match self.kind {
            ProviderKind::Ollama => vec!["llama3".into(), "mistral".into(), "codellama".into()],
            ProviderKind::OpenAi => vec!["gpt-4o".into(), "gpt-4o-mini".into(), "gpt-4-turbo".into()],
            ProviderKind::Gemini => vec!["gemini-1.5-pro".into(), "gemini-1.5-flash".into()],
            _ => Vec::new(),
        }
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        if self.config.base_url.is_empty() {
            return Err(ProviderError::ConfigMissing("base_url is empty".into()));
        }
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        match self.auth(self.client.get(url)).send().await {
            Ok(resp) if resp.status().is_success() => {
                HealthStatus { status: HealthState::Healthy, details: "models endpoint reachable".into() }
            }
            Ok(resp) => HealthStatus {
                status: HealthState::Unhealthy,
                details: format!("models endpoint returned {}", resp.status()),
            },
            Err(e) => HealthStatus { status: HealthState::Unhealthy, details: e.to_string() },
        }
    }

    async fn list_models(&self) -> Vec<String> {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        let response = match self.auth(self.client.get(url)).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(provider = %self.kind, error = %e, "list_models transient failure, returning empty fallback");
                return Vec::new();
            }
        };
        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };
        body.get("data")
            .and_then(|d| d.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.get("id").and_then(|i| i.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn execute(&self, task: Task) -> Result<Response, ProviderError> {
        let task_id = task.id.clone();
        let timeout = task.timeout;
        let body = Self::request_body(&task, false);
        let request = self.auth(self.client.post(self.chat_url()).json(&body));

        let handle = tokio::spawn(async move { tokio::time::timeout(timeout, request.send()).await });
        self.live.lock().insert(task_id.clone(), handle.abort_handle());
        let result = handle.await;
        self.live.lock().remove(&task_id);

        let response = match result {
            Ok(Ok(Ok(resp))) => resp,
            Ok(Ok(Err(e))) => return Err(ProviderError::ConnectivityFailed(e.to_string())),
            Ok(Err(_elapsed)) => return Err(ProviderError::Timeout),
            Err(join_err) if join_err.is_cancelled() => {
                return Ok(Response::cancelled());
            }
            Err(join_err) => return Err(ProviderError::ConnectivityFailed(join_err.to_string())),
        };

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Ok(Response::failed(format!("HTTP {status}: {text}")));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::BackendFailure(e.to_string()))?;

        Ok(parse_chat_response(&value))
    }

    async fn stream(&self, task: Task) -> ChunkStream {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let body = Self::request_body(&task, true);
        let request = self.auth(self.client.post(self.chat_url()).json(&body));
        let task_id = task.id.clone();
        let timeout = task.timeout;
        let live = self.live.clone();

        let handle = tokio::spawn(async move {
            run_sse(request, timeout, tx).await;
        });
        self.live.lock().insert(task_id.clone(), handle.abort_handle());
        tokio::spawn({
            let live = live.clone();
            async move {
                let _ = handle.await;
                live.lock().remove(&task_id);
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }

    async fn cancel(&self, task_id: &TaskId) -> bool {
        match self.live.lock().remove(task_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    async fn cleanup(&self) {
        let mut live = self.live.lock();
        for (_, handle) in live.drain() {
            handle.abort();
        }
    }
}

/// Races the whole request+stream-drain against `timeout` (§4.3: "every
/// implementation MUST honor the task timeout as a wall-clock ceiling"),
/// matching `subprocess.rs::run_and_stream`'s `tokio::time::timeout` race
/// around its own read-and-wait future.
async fn run_sse(request: reqwest::RequestBuilder, timeout: std::time::Duration, tx: mpsc::Sender<Chunk>) {
    if tokio::time::timeout(timeout, run_sse_inner(request, tx.clone())).await.is_err() {
        let _ = tx.send(Chunk::failed("task exceeded its timeout")).await;
    }
}

async fn run_sse_inner(request: reqwest::RequestBuilder, tx: mpsc::Sender<Chunk>) {
    let response = match request.send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            let status = r.status();
            let text = r.text().await.unwrap_or_default();
            let _ = tx.send(Chunk::failed(format!("HTTP {status}: {text}"))).await;
            return;
        }
        Err(e) => {
            let _ = tx.send(Chunk::failed(e.to_string())).await;
            return;
        }
    };

    let mut events = response.bytes_stream().eventsource();
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(ev) => ev,
            Err(e) => {
                // A malformed SSE frame is surfaced as a log-shaped chunk,
                // not a terminal failure -- the stream keeps going until
                // the backend itself signals completion.
                let _ = tx.send(Chunk::data(format!("malformed event: {e}"))).await;
                continue;
            }
        };

        if event.data.trim() == DONE_SENTINEL {
            let _ = tx.send(Chunk::done(TaskStatus::Completed)).await;
            return;
        }

        let value: serde_json::Value = match serde_json::from_str(&event.data) {
            Ok(v) => v,
            Err(_) => {
                let _ = tx.send(Chunk::data(event.data)).await;
                continue;
            }
        };

        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            let _ = tx.send(Chunk::failed(error)).await;
            return;
        }

        let delta = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        if !delta.is_empty() {
            let _ = tx.send(Chunk::data(delta)).await;
        }

        let finished = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("finish_reason"))
            .and_then(|r| r.as_str())
            .is_some();
        if finished {
            let _ = tx.send(Chunk::done(TaskStatus::Completed)).await;
            return;
        }
    }
    // Connection closed without an explicit terminator.
    let _ = tx.send(Chunk::done(TaskStatus::Completed)).await;
}

fn parse_chat_response(value: &serde_json::Value) -> Response {
    let content = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();

    let usage = value.get("usage").map(|u| Usage {
        prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: u.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    });

    let mut response = Response::completed(content);
    response.usage = usage;
    response
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
