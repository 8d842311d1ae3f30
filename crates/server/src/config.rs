// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the server binary, mirroring
//! the daemon's own `env` module: one function per variable, a sensible
//! default, never a panic on a missing or malformed value.

use std::path::PathBuf;

/// Resolve the workspace base directory: `AGENTD_STATE_DIR` >
/// `XDG_STATE_HOME/agentd` > `~/.scripton/agentd/workspaces`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AGENTD_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("agentd").join("workspaces");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".scripton").join("agentd").join("workspaces")
}

pub fn max_concurrent_agents() -> usize {
    std::env::var("AGENTD_MAX_CONCURRENT_AGENTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10)
}

pub fn agent_timeout_secs() -> u32 {
    std::env::var("AGENTD_AGENT_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300)
}

pub fn cleanup_interval_secs() -> u64 {
    std::env::var("AGENTD_CLEANUP_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300)
}

pub fn sandbox_quota_bytes() -> u64 {
    std::env::var("AGENTD_SANDBOX_QUOTA_BYTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(500 * 1024 * 1024)
}

pub fn orphan_threshold_secs() -> u64 {
    std::env::var("AGENTD_ORPHAN_THRESHOLD_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(24 * 60 * 60)
}

pub fn bind_addr() -> String {
    std::env::var("AGENTD_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8910".to_string())
}

/// Process-wide settings assembled once at startup and threaded explicitly
/// through to every component that needs one of these values, never read
/// from the environment again after this point.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub state_dir: PathBuf,
    pub max_concurrent_agents: usize,
    pub agent_timeout_secs: u32,
    pub cleanup_interval_secs: u64,
    pub sandbox_quota_bytes: u64,
    pub orphan_threshold_secs: u64,
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            state_dir: state_dir(),
            max_concurrent_agents: max_concurrent_agents(),
            agent_timeout_secs: agent_timeout_secs(),
            cleanup_interval_secs: cleanup_interval_secs(),
            sandbox_quota_bytes: sandbox_quota_bytes(),
            orphan_threshold_secs: orphan_threshold_secs(),
            bind_addr: bind_addr(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
