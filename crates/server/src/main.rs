// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agentd-server`: binds the HTTP/SSE transport to a freshly built agent
//! pool and serves it until Ctrl+C, then drains in-flight work before
//! exiting. Every component it wires together is built from a single
//! [`ServerConfig`] snapshot -- there is no reading the environment again
//! once this function starts.

use agentd_server::state::SseHub;
use agentd_server::{router, AppState, ServerConfig};
use oj_core::SystemClock;
use oj_pool::AgentManager;
use oj_policy::{PolicyConfig, SecurityPolicy};
use oj_providers::{HttpConfig, ProviderKind, ProviderRegistry, SubprocessConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Builds one provider per kind from config-derived defaults, mirroring
/// what `/ai-providers/register` would do at runtime. Registered but left
/// uninitialized here; `initialize_all` is run once, right after, so a
/// missing binary or unset API key shows up as a warning at boot rather
/// than a surprise on first use.
fn register_default_providers(registry: &ProviderRegistry) {
    let subprocess_default = |binary: &str| SubprocessConfig {
        binary_path: PathBuf::from(binary),
        extra_args: Vec::new(),
        env: Vec::new(),
    };

    registry.register(Arc::new(oj_providers::SubprocessProvider::new(
        ProviderKind::ClaudeCode,
        subprocess_default("claude"),
    )));
    registry.register(Arc::new(oj_providers::SubprocessProvider::new(
        ProviderKind::GeminiCode,
        subprocess_default("gemini"),
    )));

    let http_default = |base_url: &str, api_key_env: &str| HttpConfig {
        base_url: base_url.to_string(),
        api_key: std::env::var(api_key_env).ok(),
        request_timeout: std::time::Duration::from_secs(60),
    };

    registry.register(Arc::new(oj_providers::HttpProvider::new(
        ProviderKind::Ollama,
        http_default("http://localhost:11434/v1", "AGENTD_OLLAMA_API_KEY"),
    )));
    registry.register(Arc::new(oj_providers::HttpProvider::new(
        ProviderKind::OpenAi,
        http_default("https://api.openai.com/v1", "OPENAI_API_KEY"),
    )));
    registry.register(Arc::new(oj_providers::HttpProvider::new(
        ProviderKind::Gemini,
        http_default("https://generativelanguage.googleapis.com/v1beta/openai", "GEMINI_API_KEY"),
    )));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(bind_addr = %config.bind_addr, state_dir = ?config.state_dir, "starting agentd-server");

    let policy = Arc::new(SecurityPolicy::new(PolicyConfig {
        max_concurrent_agents: config.max_concurrent_agents,
        max_sandbox_bytes: config.sandbox_quota_bytes,
        ..PolicyConfig::default()
    }));

    let sandbox = Arc::new(
        oj_sandbox::SandboxManager::new(config.state_dir.clone(), Vec::new())
            .map(|s| s.with_orphan_threshold(std::time::Duration::from_secs(config.orphan_threshold_secs)))?,
    );

    let providers = Arc::new(ProviderRegistry::new());
    register_default_providers(&providers);
    for (kind, result) in providers.initialize_all().await {
        if let Err(e) = result {
            tracing::warn!(kind = %kind, error = %e, "provider failed to initialize at startup");
        }
    }

    let manager = Arc::new(
        AgentManager::<SystemClock>::new(policy, sandbox, providers.clone(), SystemClock)
            .with_event_queue_capacity(1024),
    );
    let sweeper = manager.spawn_background_sweeper();

    let state = AppState { manager: manager.clone(), providers, sse_hub: Arc::new(SseHub::new()) };
    let app = router(state).layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down agent manager");
    manager.shutdown().await;
    sweeper.abort();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("ctrl-c received, draining");
}
