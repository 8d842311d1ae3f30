// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oj-providers: the AI backend abstraction (C3/C4/C5).
//!
//! A [`ProviderKind`] tagged union stands in for what would otherwise be
//! an abstract-class hierarchy: every backend, subprocess or HTTP, is
//! dispatched on uniformly by the [`ProviderRegistry`] rather than by
//! subclass. Archetype A ([`SubprocessProvider`]) spawns a local CLI per
//! task; archetype B ([`HttpProvider`]) talks to a remote or local-server
//! chat API over HTTP/SSE.

mod error;
mod http;
mod kind;
mod model;
mod provider;
mod registry;
mod subprocess;

pub use error::ProviderError;
pub use http::HttpProvider;
pub use kind::{HttpConfig, ProviderConfig, ProviderKind, SubprocessConfig};
pub use model::{Chunk, ContextMessage, HealthState, HealthStatus, Response, Task, TaskId, TaskStatus, Usage};
pub use provider::{ChunkStream, Provider};
pub use registry::{ProviderInfo, ProviderRegistry};
pub use subprocess::SubprocessProvider;
