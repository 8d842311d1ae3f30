// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentd-server: the reference HTTP/SSE transport over the agent
//! orchestration stack (oj-core/policy/sandbox/providers/pool). Intentionally
//! thin -- it clamps and validates request bodies, maps errors to status
//! codes, and otherwise delegates straight to [`oj_pool::AgentManager`] and
//! [`oj_providers::ProviderRegistry`].

pub mod clamp;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::{AppState, SseHub};
