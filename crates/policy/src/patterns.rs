// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dangerous-command pattern sets for [`crate::SecurityPolicy::allow_command`].
//!
//! Grounded on `DefaultSecurityPolicy.validate_command_execution`'s dangerous
//! command set (`rm -rf /`, `dd if=`, `mkfs`, `fdisk`, `sudo`, `su`,
//! `chmod 777`, `chown root`, `iptables`, `ufw`, `systemctl`, `service`),
//! expanded here into regex categories rather than plain substrings.

/// Patterns matched case-insensitively against the lowered, trimmed command.
pub fn default_dangerous_patterns() -> Vec<String> {
    vec![
        // recursive root deletion
        r"\brm\s+-[a-z]*r[a-z]*f[a-z]*\s+/(\s|;|&|\||$)".to_string(),
        r"\brm\s+-[a-z]*f[a-z]*r[a-z]*\s+/(\s|;|&|\||$)".to_string(),
        // disk-image writes
        r"\bdd\s+if=".to_string(),
        r"\bmkfs(\.\w+)?\b".to_string(),
        r"\bfdisk\b".to_string(),
        // privilege escalation
        r"\bsudo\b".to_string(),
        r"\bsu\s+(-|root)\b".to_string(),
        r"\bchmod\s+777\b".to_string(),
        r"\bchown\s+root\b".to_string(),
        // package manager install/remove
        r"\b(apt|apt-get|yum|dnf|pacman)\s+(install|remove|purge)\b".to_string(),
        // firewall mutation
        r"\biptables\b".to_string(),
        r"\bufw\b".to_string(),
        r"\bnft\b".to_string(),
        // service control
        r"\bsystemctl\b".to_string(),
        r"\bservice\s+\w+\s+(start|stop|restart)\b".to_string(),
        // chained shell substitution wrapping an unsafe primitive
        r"[;&|]\s*(rm|dd|mkfs)\b".to_string(),
        r"[`$]\(?\s*(rm|dd|mkfs)\b".to_string(),
    ]
}

/// Patterns matched only against the *raw*, unlowered command. Shell
/// environment variable names are case-sensitive by convention, so
/// lower-casing the command first would never match a real assignment.
pub fn default_case_sensitive_patterns() -> Vec<String> {
    vec![r"\bLD_PRELOAD=".to_string(), r"\bLD_LIBRARY_PATH=".to_string()]
}
