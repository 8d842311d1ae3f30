// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Sandbox / workspace manager (C2).
//!
//! Creates isolated per-agent directories under a configured base, each
//! holding `workspace/` (agent-visible), `logs/`, and `temp/` sub-trees with
//! restrictive permissions. Validates every path access against an
//! allow-prefix list, enforces a per-agent size quota, and reclaims
//! sandboxes on disposal or via the orphan sweeper.

mod error;

pub use error::SandboxError;

use oj_core::AgentId;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Per-sandbox filesystem stats, per §4.2 `sandbox_stats`.
#[derive(Debug, Clone, Copy)]
pub struct SandboxStats {
    pub size_bytes: u64,
    pub file_count: u64,
    pub ctime: u64,
    pub mtime: u64,
    pub mode: u32,
}

/// Creates, validates, quotas, and reclaims per-agent sandbox directories.
pub struct SandboxManager {
    base: PathBuf,
    allow_prefixes: Vec<PathBuf>,
    live: Mutex<HashMap<AgentId, PathBuf>>,
    orphan_threshold: Duration,
}

impl SandboxManager {
    /// Defaults to the 24h orphan threshold named in §4.2's `sweep_orphans`.
    pub const DEFAULT_ORPHAN_THRESHOLD: Duration = Duration::from_secs(24 * 60 * 60);

    /// Build a manager rooted at `base`, creating it if absent (invariant:
    /// the base directory always exists). `allow_prefixes` are additional
    /// paths agents may read/write outside their own sandbox.
    pub fn new(base: PathBuf, allow_prefixes: Vec<PathBuf>) -> Result<Self, SandboxError> {
        std::fs::create_dir_all(&base)
            .map_err(|source| SandboxError::Create { path: base.clone(), source })?;
        Ok(Self {
            base,
            allow_prefixes: allow_prefixes.into_iter().map(|p| normalize(&p)).collect(),
            live: Mutex::new(HashMap::new()),
            orphan_threshold: Self::DEFAULT_ORPHAN_THRESHOLD,
        })
    }

    pub fn with_orphan_threshold(mut self, threshold: Duration) -> Self {
        self.orphan_threshold = threshold;
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Allocate a fresh sandbox directory for `agent_id`. Idempotent: a
    /// second call for the same id returns the same path without touching
    /// the filesystem again.
    pub fn create_sandbox(&self, agent_id: &AgentId) -> Result<PathBuf, SandboxError> {
        if let Some(existing) = self.live.lock().get(agent_id).cloned() {
            return Ok(existing);
        }

        let dir_name = format!("{agent_id}-{}", random_suffix());
        let root = self.base.join(&dir_name);

        create_dir_with_mode(&root, 0o700)?;
        create_dir_with_mode(&root.join("workspace"), 0o755)?;
        create_dir_with_mode(&root.join("logs"), 0o750)?;
        create_dir_with_mode(&root.join("temp"), 0o700)?;

        let created_at = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let identity = serde_json::json!({ "agent_id": agent_id.as_str(), "created_at": created_at });
        write_file(&root.join(".sandbox-identity.json"), &identity.to_string())?;
        write_file(
            &root.join("README"),
            "This directory is a managed agent sandbox. Do not edit its contents by hand; \
             it is reclaimed automatically when the owning agent is disposed.\n",
        )?;
        write_file(&root.join(".gitignore"), "*\n")?;

        self.live.lock().insert(agent_id.clone(), root.clone());
        tracing::info!(agent_id = %agent_id, path = %root.display(), "sandbox created");
        Ok(root)
    }

    /// Securely reclaim an agent's sandbox: walk the tree making every
    /// entry writable first, then remove it. Falls back to an ordinary
    /// recursive delete if that fails. Returns `false` if the agent has no
    /// live sandbox (benign, not an error).
    pub fn cleanup_sandbox(&self, agent_id: &AgentId) -> Result<bool, SandboxError> {
        let path = match self.live.lock().remove(agent_id) {
            Some(path) => path,
            None => return Ok(false),
        };
        secure_remove(&path)?;
        tracing::info!(agent_id = %agent_id, path = %path.display(), "sandbox reclaimed");
        Ok(true)
    }

    /// Accept a path iff it resolves inside any configured allow-prefix or
    /// inside the sandbox base directory.
    pub fn validate_path(&self, path: &Path) -> bool {
        let resolved = normalize(path);
        resolved.starts_with(&self.base)
            || self.allow_prefixes.iter().any(|prefix| resolved.starts_with(prefix))
    }

    /// Like [`Self::validate_path`] but scoped to one agent's own sandbox
    /// root rather than any sandbox under the base.
    pub fn validate_path_for_agent(&self, path: &Path, agent_id: &AgentId) -> bool {
        let resolved = normalize(path);
        let in_own_sandbox =
            self.live.lock().get(agent_id).is_some_and(|root| resolved.starts_with(root));
        in_own_sandbox || self.allow_prefixes.iter().any(|prefix| resolved.starts_with(prefix))
    }

    pub fn sandbox_path(&self, agent_id: &AgentId) -> Option<PathBuf> {
        self.live.lock().get(agent_id).cloned()
    }

    pub fn sandbox_stats(&self, agent_id: &AgentId) -> Result<SandboxStats, SandboxError> {
        let path = self
            .live
            .lock()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| SandboxError::NotFound(agent_id.to_string()))?;
        dir_stats(&path)
    }

    /// If over quota, drain `temp/` and re-check before denying.
    pub fn enforce_quota(&self, agent_id: &AgentId, max_bytes: u64) -> Result<bool, SandboxError> {
        let path = self
            .live
            .lock()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| SandboxError::NotFound(agent_id.to_string()))?;

        if dir_stats(&path)?.size_bytes <= max_bytes {
            return Ok(true);
        }

        drain_dir(&path.join("temp"))?;

        Ok(dir_stats(&path)?.size_bytes <= max_bytes)
    }

    /// Reclaim directories under the base matching the sandbox naming
    /// convention whose agent id is not live and whose mtime is older than
    /// the orphan threshold. Returns the count reclaimed.
    pub fn sweep_orphans(&self) -> Result<usize, SandboxError> {
        let entries = std::fs::read_dir(&self.base)
            .map_err(|source| SandboxError::Scan { path: self.base.clone(), source })?;

        let live = self.live.lock();
        let mut reclaimed = 0usize;

        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let Some(agent_id) = parse_sandbox_agent_id(name) else { continue };
            if live.contains_key(&agent_id) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else { continue };
            let Ok(modified) = metadata.modified() else { continue };
            let age = SystemTime::now().duration_since(modified).unwrap_or_default();
            if age >= self.orphan_threshold {
                if std::fs::remove_dir_all(&path).is_ok() {
                    tracing::info!(path = %path.display(), age_secs = age.as_secs(), "orphan sandbox reclaimed");
                    reclaimed += 1;
                }
            }
        }
        Ok(reclaimed)
    }
}

/// Sandbox directories are named `<agent_id>-<rand8 hex suffix>`; the agent
/// id itself carries the `agent-` prefix, so we strip exactly the trailing
/// `-<8 hex chars>` to recover it.
fn parse_sandbox_agent_id(dir_name: &str) -> Option<AgentId> {
    if !dir_name.starts_with(AgentId::PREFIX) {
        return None;
    }
    let (candidate_id, suffix) = dir_name.rsplit_once('-')?;
    if suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(AgentId::from_string(candidate_id))
    } else {
        None
    }
}

fn random_suffix() -> String {
    let bytes: [u8; 4] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn create_dir_with_mode(path: &Path, #[allow(unused_variables)] mode: u32) -> Result<(), SandboxError> {
    std::fs::create_dir_all(path)
        .map_err(|source| SandboxError::Create { path: path.to_path_buf(), source })?;
    #[cfg(unix)]
    {
        let perms = std::fs::Permissions::from_mode(mode);
        std::fs::set_permissions(path, perms)
            .map_err(|source| SandboxError::Create { path: path.to_path_buf(), source })?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), SandboxError> {
    std::fs::write(path, contents)
        .map_err(|source| SandboxError::Create { path: path.to_path_buf(), source })
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

fn dir_stats(path: &Path) -> Result<SandboxStats, SandboxError> {
    let root_meta = std::fs::metadata(path)
        .map_err(|source| SandboxError::Stat { path: path.to_path_buf(), source })?;

    let mut size_bytes = 0u64;
    let mut file_count = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir)
            .map_err(|source| SandboxError::Stat { path: dir.clone(), source })?;
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let Ok(meta) = entry.metadata() else { continue };
            if meta.is_dir() {
                stack.push(entry.path());
            } else {
                size_bytes += meta.len();
                file_count += 1;
            }
        }
    }

    Ok(SandboxStats {
        size_bytes,
        file_count,
        ctime: system_time_epoch_secs(root_meta.created().or_else(|_| root_meta.modified())),
        mtime: system_time_epoch_secs(root_meta.modified()),
        mode: unix_mode(&root_meta),
    })
}

fn system_time_epoch_secs(time: std::io::Result<SystemTime>) -> u64 {
    time.ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(unix)]
fn unix_mode(meta: &std::fs::Metadata) -> u32 {
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn unix_mode(_meta: &std::fs::Metadata) -> u32 {
    0
}

/// Remove every entry inside `dir` but keep the directory itself.
fn drain_dir(dir: &Path) -> Result<(), SandboxError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.is_dir() {
            let _ = std::fs::remove_dir_all(&path);
        } else {
            let _ = std::fs::remove_file(&path);
        }
    }
    Ok(())
}

/// Walk `path` making every entry writable, then remove the tree. Falls
/// back to a plain recursive delete if the chmod pass fails partway.
fn secure_remove(path: &Path) -> Result<(), SandboxError> {
    if make_tree_writable(path).is_err() {
        tracing::warn!(path = %path.display(), "sandbox chmod pass failed, falling back to plain delete");
    }
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(first_err) => {
            // One more attempt after a short best-effort re-chmod, in case
            // the first pass raced with the owning subprocess exiting.
            let _ = make_tree_writable(path);
            std::fs::remove_dir_all(path)
                .map_err(|_| SandboxError::Remove { path: path.to_path_buf(), source: first_err })
        }
    }
}

fn make_tree_writable(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        let meta = std::fs::symlink_metadata(path)?;
        if meta.is_dir() {
            let mut perms = meta.permissions();
            perms.set_mode(perms.mode() | 0o700);
            std::fs::set_permissions(path, perms)?;
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                make_tree_writable(&entry.path())?;
            }
        } else {
            let mut perms = meta.permissions();
            perms.set_mode(perms.mode() | 0o600);
            std::fs::set_permissions(path, perms)?;
        }
    }
    #[cfg(not(unix))]
    {
        if path.is_dir() {
            for entry in std::fs::read_dir(path)? {
                make_tree_writable(&entry?.path())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
