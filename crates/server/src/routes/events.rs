// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /agents/:id/events`: server-sent events over one agent's queue,
//! multiplexed through the app's [`crate::state::SseHub`] so more than one
//! client can attach to the same agent at once.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use oj_core::AgentId;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

/// `GET /agents/:id/events` -- one SSE stream per connection, fed from the
/// shared broadcast hub. A lagging client (per `BroadcastStreamRecvError::Lagged`)
/// just skips the events it missed rather than dropping the connection.
pub async fn agent_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let agent_id = AgentId::from_string(id);
    let rx = state.sse_hub.subscribe(&state.manager, &agent_id)?;

    let stream = BroadcastStream::new(rx).filter_map(move |item| match item {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Some(Ok::<_, std::convert::Infallible>(
                SseEvent::default().id(event.wire_id()).event(event.event_type.as_str()).data(data),
            ))
        }
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "sse client lagged, skipping events");
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

