// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end coverage over the HTTP/SSE transport, driven directly
//! against the axum [`Router`] via `tower::ServiceExt::oneshot` -- no
//! socket, no real provider backend. [`oj_pool::manager`]'s own test
//! module already covers the manager/pool layer exhaustively; this file
//! proves the transport wires requests to it correctly and maps its
//! errors the way §6 describes.

use agentd_server::state::SseHub;
use agentd_server::{router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use oj_pool::AgentManager;
use oj_policy::{PolicyConfig, SecurityPolicy};
use oj_providers::{ChunkStream, Chunk, HealthStatus, Provider, ProviderError, ProviderKind, ProviderRegistry, Response, Task, TaskId};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// A provider double that always completes immediately with a fixed
/// response, scripted per test via its constructor argument.
struct StubProvider {
    kind: ProviderKind,
    reply: String,
}

impl StubProvider {
    fn new(kind: ProviderKind, reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { kind, reply: reply.into() })
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn required_config_keys(&self) -> &'static [&'static str] {
        &[]
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus { status: oj_providers::HealthState::Healthy, details: "stub".into() }
    }

    async fn list_models(&self) -> Vec<String> {
        vec!["stub-model".to_string()]
    }

    async fn execute(&self, _task: Task) -> Result<Response, ProviderError> {
        Ok(Response::completed(self.reply.clone()))
    }

    async fn stream(&self, _task: Task) -> ChunkStream {
        let reply = self.reply.clone();
        Box::pin(futures::stream::iter(vec![
            Chunk::data(reply),
            Chunk::done(oj_providers::TaskStatus::Completed),
        ]))
    }

    async fn cancel(&self, _task_id: &TaskId) -> bool {
        true
    }

    async fn cleanup(&self) {}
}

struct TestApp {
    router: axum::Router,
    _sandbox_dir: tempfile::TempDir,
}

fn build_app(max_concurrent_agents: usize) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let sandbox = Arc::new(
        oj_sandbox::SandboxManager::new(dir.path().join("sandboxes"), Vec::new()).expect("sandbox manager"),
    );
    let policy = Arc::new(SecurityPolicy::new(PolicyConfig { max_concurrent_agents, ..Default::default() }));

    let registry = Arc::new(ProviderRegistry::new());
    registry.register(StubProvider::new(ProviderKind::ClaudeCode, "hello from stub"));

    let manager = Arc::new(AgentManager::new(policy, sandbox, registry.clone(), oj_core::SystemClock));
    let state = AppState { manager, providers: registry, sse_hub: Arc::new(SseHub::new()) };

    TestApp { router: router(state), _sandbox_dir: dir }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("build request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("parse json body")
}

fn default_agent_payload() -> Value {
    json!({
        "workspace_path": "/tmp",
        "provider": "claude_code",
        "model": "claude-3-5-sonnet-20241022",
        "allowed_tools": ["Read"],
    })
}

#[tokio::test]
async fn health_endpoint_reports_agent_count() {
    let app = build_app(10);
    let response = app
        .router
        .oneshot(Request::builder().uri("/agents/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["agents_count"], 0);
}

#[tokio::test]
async fn create_list_get_and_dispose_agent_round_trip() {
    let app = build_app(10);

    let create_resp = app
        .router
        .clone()
        .oneshot(json_request("POST", "/agents", default_agent_payload()))
        .await
        .expect("create response");
    assert_eq!(create_resp.status(), StatusCode::OK);
    let created = body_json(create_resp).await;
    let agent_id = created["agent_id"].as_str().expect("agent_id string").to_string();

    let list_resp = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/agents").body(Body::empty()).expect("request"))
        .await
        .expect("list response");
    let listed = body_json(list_resp).await;
    assert_eq!(listed.as_array().expect("array").len(), 1);

    let get_resp = app
        .router
        .clone()
        .oneshot(Request::builder().uri(format!("/agents/{agent_id}")).body(Body::empty()).expect("request"))
        .await
        .expect("get response");
    assert_eq!(get_resp.status(), StatusCode::OK);
    let info = body_json(get_resp).await;
    assert_eq!(info["status"], "idle");

    let dispose_resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/agents/{agent_id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispose response");
    assert_eq!(dispose_resp.status(), StatusCode::OK);

    let missing_resp = app
        .router
        .oneshot(Request::builder().uri(format!("/agents/{agent_id}")).body(Body::empty()).expect("request"))
        .await
        .expect("missing response");
    assert_eq!(missing_resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn run_task_dispatches_to_the_registered_provider() {
    let app = build_app(10);

    let create_resp = app
        .router
        .clone()
        .oneshot(json_request("POST", "/agents", default_agent_payload()))
        .await
        .expect("create response");
    let created = body_json(create_resp).await;
    let agent_id = created["agent_id"].as_str().expect("agent_id string").to_string();

    let task_resp = app
        .router
        .clone()
        .oneshot(json_request("POST", &format!("/agents/{agent_id}/tasks"), json!({"prompt": "do the thing"})))
        .await
        .expect("task response");
    assert_eq!(task_resp.status(), StatusCode::OK);
    let task_body = body_json(task_resp).await;
    assert!(task_body["run_id"].as_str().expect("run_id string").starts_with("run-"));

    // Give the monitor task a moment to drain the stubbed stream and
    // transition the agent back to idle.
    for _ in 0..20 {
        let status_resp = app
            .router
            .clone()
            .oneshot(Request::builder().uri(format!("/agents/{agent_id}")).body(Body::empty()).expect("request"))
            .await
            .expect("status response");
        let info = body_json(status_resp).await;
        if info["status"] == "idle" {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    panic!("agent never returned to idle after task completion");
}

#[tokio::test]
async fn run_task_rejects_an_empty_prompt() {
    let app = build_app(10);
    let create_resp = app
        .router
        .clone()
        .oneshot(json_request("POST", "/agents", default_agent_payload()))
        .await
        .expect("create response");
    let created = body_json(create_resp).await;
    let agent_id = created["agent_id"].as_str().expect("agent_id string").to_string();

    let task_resp = app
        .router
        .oneshot(json_request("POST", &format!("/agents/{agent_id}/tasks"), json!({"prompt": "   "})))
        .await
        .expect("task response");
    assert_eq!(task_resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_agent_fails_past_the_concurrency_ceiling() {
    let app = build_app(1);

    let first = app
        .router
        .clone()
        .oneshot(json_request("POST", "/agents", default_agent_payload()))
        .await
        .expect("first response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .router
        .oneshot(json_request("POST", "/agents", default_agent_payload()))
        .await
        .expect("second response");
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn ai_providers_register_and_list_round_trip() {
    let app = build_app(10);

    let register_resp = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/ai-providers/register",
            json!({
                "kind": "ollama",
                "base_url": "http://localhost:11434/v1",
                "api_key": null,
                "request_timeout": 30,
            }),
        ))
        .await
        .expect("register response");
    assert_eq!(register_resp.status(), StatusCode::OK);

    let list_resp = app
        .router
        .oneshot(Request::builder().uri("/ai-providers").body(Body::empty()).expect("request"))
        .await
        .expect("list response");
    assert_eq!(list_resp.status(), StatusCode::OK);
    let providers = body_json(list_resp).await;
    assert!(providers.get("claude_code").is_some());
    let ollama = providers.get("ollama").expect("ollama entry");
    assert!(ollama.get("status").is_some());
    assert!(ollama.get("schema").is_some());
}

#[tokio::test]
async fn ai_providers_tasks_runs_directly_against_a_provider_kind() {
    let app = build_app(10);

    let resp = app
        .router
        .oneshot(json_request(
            "POST",
            "/ai-providers/tasks",
            json!({
                "kind": "claude_code",
                "prompt": "ping",
                "model": "claude-3-5-sonnet-20241022",
            }),
        ))
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["content"], "hello from stub");
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn ai_providers_tasks_with_stream_flag_returns_an_sse_body() {
    let app = build_app(10);

    let resp = app
        .router
        .oneshot(json_request(
            "POST",
            "/ai-providers/tasks",
            json!({
                "kind": "claude_code",
                "prompt": "ping",
                "model": "claude-3-5-sonnet-20241022",
                "stream": true,
            }),
        ))
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").cloned();
    assert_eq!(content_type.expect("content-type header"), "text/event-stream");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8 body");
    assert!(text.contains("hello from stub"));
    assert!(text.contains("\"done\":true"));
}

#[test]
fn server_binary_starts_and_binds_without_panicking() {
    use std::time::Duration;

    let mut child = assert_cmd::Command::cargo_bin("agentd-server")
        .expect("locate agentd-server binary")
        .env("AGENTD_BIND_ADDR", "127.0.0.1:0")
        .env("AGENTD_STATE_DIR", std::env::temp_dir().join("agentd-specs-smoke"))
        .spawn()
        .expect("spawn agentd-server");

    std::thread::sleep(Duration::from_millis(300));
    let still_running = child.try_wait().expect("poll child").is_none();
    let _ = child.kill();
    let _ = child.wait();

    assert!(still_running, "agentd-server exited immediately instead of staying up to serve");
}
