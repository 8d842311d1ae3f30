// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state, built once at startup and cloned cheaply
//! (everything inside is an `Arc`) into every axum handler via
//! `State<AppState>`. No process-wide singletons anywhere else.

use futures::StreamExt;
use oj_core::{AgentId, Event};
use oj_pool::AgentManager;
use oj_providers::ProviderRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

const SSE_FANOUT_CAPACITY: usize = 1024;

/// Fans one agent's single-consumer event stream (from the pool) out to
/// however many SSE clients are currently attached to it. The pool's
/// `stream_events` is single-subscriber by design (§4.6); this is the
/// transport-layer multiplexer the pool explicitly defers to its caller.
#[derive(Default)]
pub struct SseHub {
    senders: Mutex<HashMap<AgentId, broadcast::Sender<Event>>>,
}

impl SseHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a receiver for `agent_id`'s events, spawning the one
    /// pool-draining task for that agent on first subscription.
    pub fn subscribe(&self, manager: &Arc<AgentManager>, agent_id: &AgentId) -> Result<broadcast::Receiver<Event>, oj_pool::PoolError> {
        let mut senders = self.senders.lock();
        if let Some(tx) = senders.get(agent_id) {
            return Ok(tx.subscribe());
        }

        let (tx, rx) = broadcast::channel(SSE_FANOUT_CAPACITY);
        let mut pool_stream = manager.stream_events(agent_id)?;
        let agent_id_owned = agent_id.clone();
        let tx_task = tx.clone();
        tokio::spawn(async move {
            while let Some(event) = pool_stream.next().await {
                // Ignore "no receivers" errors: a subscriber may attach
                // again later and should keep getting fed from here on.
                let _ = tx_task.send(event);
            }
            tracing::debug!(agent_id = %agent_id_owned, "sse fan-out task ended");
        });
        senders.insert(agent_id.clone(), tx);
        Ok(rx)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<AgentManager>,
    pub providers: Arc<ProviderRegistry>,
    pub sse_hub: Arc<SseHub>,
}
