// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::AgentId;
use proptest::prelude::*;

fn policy() -> SecurityPolicy {
    SecurityPolicy::new(PolicyConfig::default())
}

#[test]
fn allows_configured_tool() {
    let p = policy();
    let id = AgentId::new();
    assert!(p.allow_tool("Read", &id));
}

#[test]
fn denies_unconfigured_tool() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_tool("Nuke", &id));
}

#[test]
fn denies_forbidden_path_prefix() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_path(Path::new("/etc/passwd"), &id));
    assert!(!p.allow_path(Path::new("/root/.ssh/id_rsa"), &id));
}

#[test]
fn allows_path_outside_forbidden_prefixes() {
    let p = policy();
    let id = AgentId::new();
    assert!(p.allow_path(Path::new("/tmp/workspace/file.txt"), &id));
}

#[test]
fn dot_segments_cannot_escape_a_forbidden_prefix_check() {
    let p = policy();
    let id = AgentId::new();
    // Lexically normalizes before comparing, so `..` doesn't fool the prefix check.
    assert!(!p.allow_path(Path::new("/tmp/../etc/passwd"), &id));
}

#[test]
fn denies_recursive_root_delete() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_command("rm -rf /", &id));
    assert!(!p.allow_command("RM -RF /", &id));
    assert!(!p.allow_command("rm -fr /", &id));
}

#[test]
fn denies_disk_image_writes() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_command("dd if=/dev/zero of=/dev/sda", &id));
    assert!(!p.allow_command("mkfs.ext4 /dev/sda1", &id));
    assert!(!p.allow_command("fdisk /dev/sda", &id));
}

#[test]
fn denies_privilege_escalation() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_command("sudo apt-get update", &id));
    assert!(!p.allow_command("su root", &id));
    assert!(!p.allow_command("chmod 777 /etc/shadow", &id));
    assert!(!p.allow_command("chown root /bin/sh", &id));
}

#[test]
fn denies_package_manager_mutation() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_command("apt-get install netcat", &id));
    assert!(!p.allow_command("yum remove firewalld", &id));
}

#[test]
fn denies_firewall_and_service_mutation() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_command("iptables -F", &id));
    assert!(!p.allow_command("ufw disable", &id));
    assert!(!p.allow_command("systemctl stop sshd", &id));
    assert!(!p.allow_command("service sshd stop", &id));
}

#[test]
fn denies_chained_shell_substitution_with_unsafe_primitive() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_command("echo hi; rm -rf /var", &id));
    assert!(!p.allow_command("echo $(rm file)", &id));
}

#[test]
fn denies_case_sensitive_env_overrides_regardless_of_case_folding() {
    let p = policy();
    let id = AgentId::new();
    assert!(!p.allow_command("LD_PRELOAD=/tmp/evil.so ./app", &id));
}

#[test]
fn allows_benign_command() {
    let p = policy();
    let id = AgentId::new();
    assert!(p.allow_command("echo hello world", &id));
    assert!(p.allow_command("cargo test --workspace", &id));
}

struct FakeObserver(Option<ResourceUsage>);

impl ResourceObserver for FakeObserver {
    fn usage(&self, _agent_id: &AgentId) -> Option<ResourceUsage> {
        self.0
    }
}

#[test]
fn resource_usage_within_ceiling_is_ok() {
    let p = policy();
    let id = AgentId::new();
    let observer = FakeObserver(Some(ResourceUsage { cpu_percent: 10.0, rss_bytes: 1024 }));
    assert!(p.resource_usage_ok(&id, &observer));
}

#[test]
fn resource_usage_over_ceiling_fails_closed() {
    let p = policy();
    let id = AgentId::new();
    let observer = FakeObserver(Some(ResourceUsage { cpu_percent: 99.0, rss_bytes: u64::MAX }));
    assert!(!p.resource_usage_ok(&id, &observer));
}

#[test]
fn resource_usage_unavailable_fails_open() {
    let p = policy();
    let id = AgentId::new();
    let observer = FakeObserver(None);
    assert!(p.resource_usage_ok(&id, &observer));
}

#[test]
fn mutators_add_and_remove_tools_and_paths() {
    let mut p = policy();
    let id = AgentId::new();
    p.add_allowed_tool("Nuke");
    assert!(p.allow_tool("Nuke", &id));
    p.remove_allowed_tool("Nuke");
    assert!(!p.allow_tool("Nuke", &id));

    p.add_forbidden_path("/tmp/quarantine");
    assert!(!p.allow_path(Path::new("/tmp/quarantine/x"), &id));
    p.remove_forbidden_path("/tmp/quarantine");
    assert!(p.allow_path(Path::new("/tmp/quarantine/x"), &id));
}

proptest! {
    /// Any string containing a known-dangerous token is still denied once
    /// surrounded by arbitrary padding -- pattern matching is substring-style,
    /// not full-string equality.
    #[test]
    fn sudo_is_always_denied_regardless_of_surrounding_text(
        prefix in "[a-z ]{0,10}",
        suffix in "[a-z ]{0,10}",
    ) {
        let p = policy();
        let id = AgentId::new();
        let command = format!("{prefix}sudo{suffix}");
        prop_assert!(!p.allow_command(&command, &id));
    }

    /// Forbidden-path membership is never affected by a trailing slash.
    #[test]
    fn forbidden_prefix_matches_regardless_of_trailing_components(
        suffix in "[a-zA-Z0-9_/]{0,20}",
    ) {
        let p = policy();
        let id = AgentId::new();
        let path = format!("/etc/{suffix}");
        prop_assert!(!p.allow_path(Path::new(&path), &id));
    }
}
