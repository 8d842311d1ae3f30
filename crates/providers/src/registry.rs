// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The provider registry (C5): dispatch-by-kind over whichever providers
//! were registered, grounded on the router-dispatch pattern used for
//! backend selection elsewhere in this codebase. Tracks which provider is
//! running which task so that a bare `TaskId` is enough to route a
//! `cancel()`, and guarantees the tracking entry is cleared on every exit
//! path -- success, failure, or cancellation.

use crate::error::ProviderError;
use crate::kind::ProviderKind;
use crate::model::{Chunk, HealthState, HealthStatus, Response, Task, TaskId};
use crate::provider::{ChunkStream, Provider};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Clears a task's registry-level tracking entry when dropped, regardless
/// of which path out of `execute`/`stream` was taken.
struct TaskGuard {
    task_id: TaskId,
    tracking: Arc<Mutex<HashMap<TaskId, ProviderKind>>>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.tracking.lock().remove(&self.task_id);
    }
}

/// Per-kind snapshot for the management surface (`/ai-providers`).
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub initialized: bool,
    pub required_config_keys: Vec<&'static str>,
    pub models: Vec<String>,
    pub status: HealthStatus,
}

/// Owns one [`Provider`] per registered [`ProviderKind`] and dispatches
/// calls to the right one.
///
/// `providers` is an `RwLock`, not a plain `HashMap`, so that
/// `register`/`unregister` can be called through a shared `Arc` -- the
/// `/ai-providers/register` management endpoint and the agent manager
/// both hold the same registry instance, and neither owns it exclusively.
pub struct ProviderRegistry {
    providers: parking_lot::RwLock<HashMap<ProviderKind, Arc<dyn Provider>>>,
    initialized: Mutex<HashMap<ProviderKind, bool>>,
    tracking: Arc<Mutex<HashMap<TaskId, ProviderKind>>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: parking_lot::RwLock::new(HashMap::new()),
            initialized: Mutex::new(HashMap::new()),
            tracking: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a provider, replacing any prior registration for the same
    /// kind. Marked uninitialized until `initialize_all` (or a direct
    /// `initialize()` call through `execute`/`stream`'s guard) succeeds.
    pub fn register(&self, provider: Arc<dyn Provider>) {
        let kind = provider.kind();
        self.providers.write().insert(kind, provider);
        self.initialized.lock().insert(kind, false);
    }

    pub fn unregister(&self, kind: ProviderKind) -> Option<Arc<dyn Provider>> {
        self.initialized.lock().remove(&kind);
        self.providers.write().remove(&kind)
    }

    pub fn is_registered(&self, kind: ProviderKind) -> bool {
        self.providers.read().contains_key(&kind)
    }

    pub fn registered_kinds(&self) -> Vec<ProviderKind> {
        self.providers.read().keys().copied().collect()
    }

    fn provider_for(&self, kind: ProviderKind) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers.read().get(&kind).cloned().ok_or_else(|| ProviderError::UnknownKind(kind.to_string()))
    }

    /// Runs `initialize()` on every registered provider, collecting each
    /// outcome rather than failing fast -- one misconfigured backend
    /// shouldn't prevent the others from coming up.
    pub async fn initialize_all(&self) -> Vec<(ProviderKind, Result<(), ProviderError>)> {
        let snapshot: Vec<(ProviderKind, Arc<dyn Provider>)> =
            self.providers.read().iter().map(|(k, v)| (*k, v.clone())).collect();
        let mut results = Vec::with_capacity(snapshot.len());
        for (kind, provider) in snapshot {
            let outcome = provider.initialize().await;
            self.initialized.lock().insert(kind, outcome.is_ok());
            results.push((kind, outcome));
        }
        results
    }

    /// Per-kind snapshot for the `/ai-providers` management endpoint.
    pub async fn providers_info(&self) -> HashMap<ProviderKind, ProviderInfo> {
        let snapshot: Vec<(ProviderKind, Arc<dyn Provider>)> =
            self.providers.read().iter().map(|(k, v)| (*k, v.clone())).collect();
        let mut info = HashMap::with_capacity(snapshot.len());
        for (kind, provider) in snapshot {
            let initialized = self.initialized.lock().get(&kind).copied().unwrap_or(false);
            let models = if initialized { provider.list_models().await } else { provider.available_models() };
            let status = if initialized {
                provider.health_check().await
            } else {
                HealthStatus { status: HealthState::Unknown, details: "not yet initialized".into() }
            };
            info.insert(
                kind,
                ProviderInfo { initialized, required_config_keys: provider.required_config_keys().to_vec(), models, status },
            );
        }
        info
    }

    pub async fn health_check_all(&self) -> HashMap<ProviderKind, HealthStatus> {
        let snapshot: Vec<(ProviderKind, Arc<dyn Provider>)> =
            self.providers.read().iter().map(|(k, v)| (*k, v.clone())).collect();
        let mut statuses = HashMap::with_capacity(snapshot.len());
        for (kind, provider) in snapshot {
            statuses.insert(kind, provider.health_check().await);
        }
        statuses
    }

    pub async fn list_models(&self, kind: ProviderKind) -> Result<Vec<String>, ProviderError> {
        Ok(self.provider_for(kind)?.list_models().await)
    }

    fn require_initialized(&self, kind: ProviderKind) -> Result<(), ProviderError> {
        match self.initialized.lock().get(&kind).copied() {
            Some(true) => Ok(()),
            _ => Err(ProviderError::NotInitialized),
        }
    }

    pub async fn execute(&self, kind: ProviderKind, task: Task) -> Result<Response, ProviderError> {
        let provider = self.provider_for(kind)?;
        self.require_initialized(kind)?;
        let task_id = task.id.clone();
        self.tracking.lock().insert(task_id.clone(), kind);
        let _guard = TaskGuard { task_id, tracking: self.tracking.clone() };
        provider.execute(task).await
    }

    /// Streams a task, forwarding chunks to the caller while keeping the
    /// task-id->kind tracking entry alive until the provider's own stream
    /// terminates (or the caller drops the returned stream). A missing or
    /// uninitialised provider never returns `Err` here -- it yields a
    /// single synthetic failure chunk instead, so callers can treat every
    /// `stream()` result uniformly as a chunk sequence.
    pub async fn stream(&self, kind: ProviderKind, task: Task) -> ChunkStream {
        let provider = match self.provider_for(kind).and_then(|p| {
            self.require_initialized(kind)?;
            Ok(p)
        }) {
            Ok(provider) => provider,
            Err(e) => return Box::pin(futures::stream::once(async move { Chunk::failed(e.to_string()) })),
        };

        let task_id = task.id.clone();
        self.tracking.lock().insert(task_id.clone(), kind);
        let guard = TaskGuard { task_id, tracking: self.tracking.clone() };

        let (tx, rx) = mpsc::channel::<Chunk>(EVENT_QUEUE_CAPACITY);
        tokio::spawn(async move {
            let _guard = guard;
            use futures::StreamExt;
            let mut inner = provider.stream(task).await;
            while let Some(chunk) = inner.next().await {
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }

    /// Routes a cancellation to whichever provider is tracked as running
    /// `task_id`. Returns `false` for an unknown or already-finished task.
    pub async fn cancel(&self, task_id: &TaskId) -> bool {
        let kind = match self.tracking.lock().get(task_id).copied() {
            Some(kind) => kind,
            None => return false,
        };
        let provider = self.providers.read().get(&kind).cloned();
        match provider {
            Some(provider) => provider.cancel(task_id).await,
            None => false,
        }
    }

    /// Runs `cleanup()` on every registered provider. Called on server
    /// shutdown.
    pub async fn shutdown(&self) {
        let snapshot: Vec<Arc<dyn Provider>> = self.providers.read().values().cloned().collect();
        for provider in snapshot {
            provider.cleanup().await;
        }
        self.tracking.lock().clear();
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
