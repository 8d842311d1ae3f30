// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Security policy engine (C1).
//!
//! A value-type component consulted by the sandbox manager, the provider
//! implementations, and the agent lifecycle manager. Violations never
//! throw: they return `false` and emit a structured `tracing` warning,
//! leaving the caller to decide whether the denial becomes a user-visible
//! error.

mod patterns;

pub use patterns::{default_case_sensitive_patterns, default_dangerous_patterns};

use oj_core::AgentId;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Allow/deny rule sets and resource ceilings. Defaults are grounded on
/// `DefaultSecurityPolicy.__init__`.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub allowed_tools: HashSet<String>,
    pub forbidden_paths: Vec<PathBuf>,
    pub dangerous_patterns: Vec<String>,
    pub case_sensitive_patterns: Vec<String>,
    pub max_concurrent_agents: usize,
    pub max_sandbox_bytes: u64,
    pub max_cpu_percent: f32,
    pub max_rss_bytes: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_tools: ["Read", "Edit", "Write", "Bash", "Grep", "Glob"]
                .into_iter()
                .map(String::from)
                .collect(),
            forbidden_paths: ["/etc", "~/.ssh", "/root", "/sys", "/proc"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            dangerous_patterns: default_dangerous_patterns(),
            case_sensitive_patterns: default_case_sensitive_patterns(),
            max_concurrent_agents: 10,
            max_sandbox_bytes: 500 * 1024 * 1024,
            max_cpu_percent: 80.0,
            max_rss_bytes: 1024 * 1024 * 1024,
        }
    }
}

/// Observed CPU/RSS for one agent's subprocess set. `None` from
/// [`ResourceObserver::usage`] means "unavailable", not "zero".
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceUsage {
    pub cpu_percent: f32,
    pub rss_bytes: u64,
}

/// Supplies resource accounting to [`SecurityPolicy::resource_usage_ok`].
/// The pool's monitor owns the real implementation; tests supply a fake.
pub trait ResourceObserver: Send + Sync {
    fn usage(&self, agent_id: &AgentId) -> Option<ResourceUsage>;
}

/// A compiled policy, built once from a [`PolicyConfig`] and shared
/// read-only across the agent pool for the process lifetime.
pub struct SecurityPolicy {
    allowed_tools: HashSet<String>,
    forbidden_paths: Vec<PathBuf>,
    dangerous: Vec<Regex>,
    case_sensitive: Vec<Regex>,
    max_concurrent_agents: usize,
    max_sandbox_bytes: u64,
    max_cpu_percent: f32,
    max_rss_bytes: u64,
}

impl SecurityPolicy {
    /// Compile a policy from config. Panics only if a built-in pattern
    /// fails to compile, which would be a programming error rather than
    /// bad input — callers never pass arbitrary regex text here.
    pub fn new(config: PolicyConfig) -> Self {
        let dangerous = config
            .dangerous_patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("dangerous pattern must compile"))
            .collect();
        let case_sensitive = config
            .case_sensitive_patterns
            .iter()
            .map(|p| Regex::new(p).expect("case-sensitive pattern must compile"))
            .collect();
        let forbidden_paths = config.forbidden_paths.iter().map(|p| expand_tilde(p)).collect();
        Self {
            allowed_tools: config.allowed_tools,
            forbidden_paths,
            dangerous,
            case_sensitive,
            max_concurrent_agents: config.max_concurrent_agents,
            max_sandbox_bytes: config.max_sandbox_bytes,
            max_cpu_percent: config.max_cpu_percent,
            max_rss_bytes: config.max_rss_bytes,
        }
    }

    /// Deny if `tool_name` is not in the configured allow-set.
    pub fn allow_tool(&self, tool_name: &str, agent_id: &AgentId) -> bool {
        let allowed = self.allowed_tools.contains(tool_name);
        if !allowed {
            tracing::warn!(agent_id = %agent_id, tool = tool_name, "tool denied by policy");
        }
        allowed
    }

    /// Deny if `path`, once resolved to an absolute, dot-free form, falls
    /// under any forbidden prefix. Resolution here is lexical (no
    /// `readlink`/filesystem access) — the sandbox manager is responsible
    /// for resolving symlinks before a path crosses this boundary.
    pub fn allow_path(&self, path: &Path, agent_id: &AgentId) -> bool {
        let resolved = normalize(&expand_tilde(path));
        let denied = self.forbidden_paths.iter().any(|forbidden| resolved.starts_with(forbidden));
        if denied {
            tracing::warn!(agent_id = %agent_id, path = %resolved.display(), "path denied by policy");
        }
        !denied
    }

    /// Deny if `command` matches any dangerous pattern. The lowered,
    /// trimmed command is tested against every case-insensitive pattern;
    /// the raw command is additionally tested against the small set of
    /// patterns that are only meaningful case-sensitively.
    pub fn allow_command(&self, command: &str, agent_id: &AgentId) -> bool {
        let lowered = command.trim().to_lowercase();
        let matched = self.dangerous.iter().any(|re| re.is_match(&lowered))
            || self.case_sensitive.iter().any(|re| re.is_match(command));
        if matched {
            tracing::warn!(agent_id = %agent_id, command = command, "command denied by policy");
        }
        !matched
    }

    /// Sum observed CPU/RSS and compare against the configured ceilings.
    /// Fails closed only on clear excess; fails open (returns `true`) if
    /// the observer reports no data, since lack of visibility should not
    /// itself halt an agent.
    pub fn resource_usage_ok(&self, agent_id: &AgentId, observer: &dyn ResourceObserver) -> bool {
        match observer.usage(agent_id) {
            Some(usage) => {
                let within =
                    usage.cpu_percent <= self.max_cpu_percent && usage.rss_bytes <= self.max_rss_bytes;
                if !within {
                    tracing::warn!(
                        agent_id = %agent_id,
                        cpu_percent = usage.cpu_percent,
                        rss_bytes = usage.rss_bytes,
                        "resource ceiling exceeded"
                    );
                }
                within
            }
            None => {
                tracing::debug!(agent_id = %agent_id, "resource usage unavailable, failing open");
                true
            }
        }
    }

    pub fn max_concurrent_agents(&self) -> usize {
        self.max_concurrent_agents
    }

    pub fn max_sandbox_bytes(&self) -> u64 {
        self.max_sandbox_bytes
    }

    pub fn add_allowed_tool(&mut self, tool_name: impl Into<String>) {
        self.allowed_tools.insert(tool_name.into());
    }

    pub fn remove_allowed_tool(&mut self, tool_name: &str) {
        self.allowed_tools.remove(tool_name);
    }

    pub fn add_forbidden_path(&mut self, path: impl AsRef<Path>) {
        self.forbidden_paths.push(normalize(&expand_tilde(path.as_ref())));
    }

    pub fn remove_forbidden_path(&mut self, path: impl AsRef<Path>) {
        let target = normalize(&expand_tilde(path.as_ref()));
        self.forbidden_paths.retain(|p| p != &target);
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

/// Collapse `.`/`..` components lexically without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
