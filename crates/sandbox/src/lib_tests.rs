// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::AgentId;
use std::time::Duration;
use tempfile::tempdir;

fn manager() -> (tempfile::TempDir, SandboxManager) {
    let tmp = tempdir().unwrap();
    let mgr = SandboxManager::new(tmp.path().join("sandboxes"), vec![]).unwrap();
    (tmp, mgr)
}

#[test]
fn create_sandbox_builds_expected_subtree() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();

    assert!(root.join("workspace").is_dir());
    assert!(root.join("logs").is_dir());
    assert!(root.join("temp").is_dir());
    assert!(root.join("README").is_file());
    assert!(root.join(".gitignore").is_file());
    assert!(root.join(".sandbox-identity.json").is_file());
}

#[cfg(unix)]
#[test]
fn create_sandbox_sets_restrictive_modes() {
    use std::os::unix::fs::PermissionsExt;
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();

    let mode = |p: &std::path::Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&root), 0o700);
    assert_eq!(mode(&root.join("workspace")), 0o755);
    assert_eq!(mode(&root.join("logs")), 0o750);
    assert_eq!(mode(&root.join("temp")), 0o700);
}

#[test]
fn create_sandbox_is_idempotent() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let first = mgr.create_sandbox(&id).unwrap();
    let second = mgr.create_sandbox(&id).unwrap();
    assert_eq!(first, second);
}

#[test]
fn two_agents_never_share_a_sandbox_path() {
    let (_tmp, mgr) = manager();
    let a = mgr.create_sandbox(&AgentId::new()).unwrap();
    let b = mgr.create_sandbox(&AgentId::new()).unwrap();
    assert_ne!(a, b);
}

#[test]
fn cleanup_removes_directory_from_disk() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();
    assert!(root.exists());

    let removed = mgr.cleanup_sandbox(&id).unwrap();
    assert!(removed);
    assert!(!root.exists());
}

#[test]
fn cleanup_of_unknown_agent_returns_false_not_error() {
    let (_tmp, mgr) = manager();
    let result = mgr.cleanup_sandbox(&AgentId::new()).unwrap();
    assert!(!result);
}

#[test]
fn cleanup_is_not_idempotent_a_second_call_returns_false() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    mgr.create_sandbox(&id).unwrap();
    assert!(mgr.cleanup_sandbox(&id).unwrap());
    assert!(!mgr.cleanup_sandbox(&id).unwrap());
}

#[test]
fn validate_path_accepts_inside_base_and_rejects_outside() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();

    assert!(mgr.validate_path(&root.join("workspace/file.txt")));
    assert!(!mgr.validate_path(std::path::Path::new("/etc/passwd")));
}

#[test]
fn validate_path_accepts_configured_allow_prefix() {
    let tmp = tempdir().unwrap();
    let allow = tmp.path().join("shared");
    std::fs::create_dir_all(&allow).unwrap();
    let mgr = SandboxManager::new(tmp.path().join("sandboxes"), vec![allow.clone()]).unwrap();

    assert!(mgr.validate_path(&allow.join("thing.txt")));
}

#[test]
fn validate_path_rejects_dot_dot_escape() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();
    let escaping = root.join("workspace/../../../etc/passwd");
    assert!(!mgr.validate_path(&escaping));
}

#[test]
fn validate_path_for_agent_is_scoped_to_its_own_sandbox() {
    let (_tmp, mgr) = manager();
    let a = AgentId::new();
    let b = AgentId::new();
    let root_a = mgr.create_sandbox(&a).unwrap();
    mgr.create_sandbox(&b).unwrap();

    assert!(mgr.validate_path_for_agent(&root_a.join("workspace/f"), &a));
    assert!(!mgr.validate_path_for_agent(&root_a.join("workspace/f"), &b));
}

#[test]
fn sandbox_stats_reports_size_and_file_count() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();
    std::fs::write(root.join("workspace/a.txt"), "hello world").unwrap();

    let stats = mgr.sandbox_stats(&id).unwrap();
    assert!(stats.size_bytes >= 11);
    assert!(stats.file_count >= 1);
}

#[test]
fn sandbox_stats_of_unknown_agent_errors() {
    let (_tmp, mgr) = manager();
    assert!(mgr.sandbox_stats(&AgentId::new()).is_err());
}

#[test]
fn enforce_quota_accepts_exactly_at_quota() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    mgr.create_sandbox(&id).unwrap();
    let stats = mgr.sandbox_stats(&id).unwrap();
    assert!(mgr.enforce_quota(&id, stats.size_bytes).unwrap());
}

#[test]
fn enforce_quota_drains_temp_before_denying() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();
    std::fs::write(root.join("temp/scratch.bin"), vec![0u8; 1024]).unwrap();

    let baseline = dir_stats(&root.join("workspace")).map(|s| s.size_bytes).unwrap_or(0);
    assert!(mgr.enforce_quota(&id, baseline).unwrap());
    assert!(root.join("temp").is_dir());
    assert_eq!(std::fs::read_dir(root.join("temp")).unwrap().count(), 0);
}

#[test]
fn enforce_quota_denies_when_still_over_after_drain() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();
    std::fs::write(root.join("workspace/big.bin"), vec![0u8; 4096]).unwrap();

    assert!(!mgr.enforce_quota(&id, 1).unwrap());
}

#[test]
fn sweep_orphans_reclaims_old_unreferenced_directories() {
    let (_tmp, mgr) = manager();
    let fake_dir = mgr.base().join("agent-deadbeefcafebabe0000000000000000-abcd1234");
    std::fs::create_dir_all(&fake_dir).unwrap();
    set_mtime_past(&fake_dir, Duration::from_secs(25 * 60 * 60));

    let reclaimed = mgr.sweep_orphans().unwrap();
    assert_eq!(reclaimed, 1);
    assert!(!fake_dir.exists());
}

#[test]
fn sweep_orphans_leaves_live_agents_alone() {
    let (_tmp, mgr) = manager();
    let id = AgentId::new();
    let root = mgr.create_sandbox(&id).unwrap();
    set_mtime_past(&root, Duration::from_secs(25 * 60 * 60));

    let reclaimed = mgr.sweep_orphans().unwrap();
    assert_eq!(reclaimed, 0);
    assert!(root.exists());
}

#[test]
fn sweep_orphans_leaves_recent_directories_alone() {
    let (_tmp, mgr) = manager();
    let fake_dir = mgr.base().join("agent-recentcafebabe0000000000000000-abcd1234");
    std::fs::create_dir_all(&fake_dir).unwrap();

    let reclaimed = mgr.sweep_orphans().unwrap();
    assert_eq!(reclaimed, 0);
    assert!(fake_dir.exists());
}

/// Backdate a directory's mtime so orphan-sweep tests don't need to sleep
/// for real threshold durations.
fn set_mtime_past(path: &std::path::Path, age: Duration) {
    let past = std::time::SystemTime::now() - age;
    if let Ok(dir) = std::fs::File::open(path) {
        let _ = dir.set_modified(past);
    }
}
