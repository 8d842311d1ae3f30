// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

/// `GET /agents/health` -- a liveness probe over the manager itself, not
/// any individual agent. Always 200; there is no failure mode for "the
/// process that's answering this request is up".
pub async fn agents_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "agents_count": state.manager.live_agent_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
