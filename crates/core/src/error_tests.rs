// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_includes_kind_and_message() {
    let err = CoreError::not_found("agent agent-123 not found");
    assert_eq!(err.to_string(), "not_found: agent agent-123 not found");
}

#[test]
fn backend_failure_carries_detail() {
    let err = CoreError::backend_failure("task failed", "exit code 1: permission denied");
    assert_eq!(err.kind, ErrorKind::BackendFailure);
    assert_eq!(err.backend_detail.as_deref(), Some("exit code 1: permission denied"));
}

#[test]
fn non_backend_errors_carry_no_detail() {
    let err = CoreError::validation("bad config");
    assert!(err.backend_detail.is_none());
}

#[test]
fn kind_display_is_snake_case() {
    assert_eq!(ErrorKind::CapacityExceeded.to_string(), "capacity_exceeded");
    assert_eq!(ErrorKind::PolicyDenied.to_string(), "policy_denied");
}
