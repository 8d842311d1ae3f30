// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod agents;
mod events;
mod health;
mod providers;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Assembles the full route table. Kept as one function so the binary and
/// any future test harness build an identical router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/agents", post(agents::create_agent).get(agents::list_agents))
        .route("/agents/:id", get(agents::get_agent).delete(agents::dispose_agent))
        .route("/agents/:id/tasks", post(agents::run_task))
        .route("/agents/:id/events", get(events::agent_events))
        .route("/agents/:id/cancel/:run_id", post(agents::cancel_task))
        .route("/agents/health", get(health::agents_health))
        .route("/ai-providers/register", post(providers::register_provider))
        .route("/ai-providers", get(providers::list_providers))
        .route("/ai-providers/tasks", post(providers::run_provider_task))
        .with_state(state)
}
