// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform provider contract (C3), implemented by each backend
//! archetype in §4.4.

use crate::error::ProviderError;
use crate::kind::ProviderKind;
use crate::model::{Chunk, HealthStatus, Response, Task, TaskId};
use async_trait::async_trait;
use std::pin::Pin;

pub type ChunkStream = Pin<Box<dyn futures::Stream<Item = Chunk> + Send>>;

/// A uniform interface over heterogeneous AI backends. Every method that
/// the spec marks "never fails" or "never throws" returns a plain value,
/// not a `Result` -- callers should never need to handle an `Err` from
/// `health_check`, `cancel`, or `cleanup`.
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Config keys this provider's blob must carry, so the registry can
    /// reject a malformed registration with a precise `Validation` error
    /// instead of a late `config-missing` failure during `initialize()`.
    fn required_config_keys(&self) -> &'static [&'static str];

    /// A small, static fallback model list usable before the first
    /// successful `list_models()` round-trip. Empty by default.
    fn available_models(&self) -> Vec<String> {
        Vec::new()
    }

    /// Perform one-time setup from stored config (e.g. verify a binary
    /// exists, or probe connectivity). Called once by the registry's
    /// `initialize_all`.
    async fn initialize(&self) -> Result<(), ProviderError>;

    /// Never fails; reports unhealthy instead of propagating an error.
    async fn health_check(&self) -> HealthStatus;

    /// Ordered list of model ids. Transient network errors fall back to
    /// whatever was last cached rather than propagating.
    async fn list_models(&self) -> Vec<String>;

    async fn execute(&self, task: Task) -> Result<Response, ProviderError>;

    /// Lazy, finite, not-restartable sequence of chunks. Backend/timeout
    /// errors are encoded into the last chunk rather than returned as `Err`.
    async fn stream(&self, task: Task) -> ChunkStream;

    /// Never throws; returns `false` if the task is unknown or already
    /// finished.
    async fn cancel(&self, task_id: &TaskId) -> bool;

    /// Never throws.
    async fn cleanup(&self);
}
