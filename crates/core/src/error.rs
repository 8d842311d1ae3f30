// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy for the agent pool.
//!
//! Every subsystem (policy, sandbox, providers, pool) defines its own
//! `thiserror` enum; [`CoreError`] is the taxonomy the transport layer maps
//! to HTTP status codes. Kinds never carry a retry decision — that's the
//! caller's call.

use serde::Serialize;
use std::fmt;

/// Error kind, stable across subsystems so the transport can map it to a
/// status code without matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed config or request; never retried.
    Validation,
    /// Unknown agent or run.
    NotFound,
    /// Agent ceiling reached.
    CapacityExceeded,
    /// Subprocess non-zero exit or HTTP backend error.
    BackendFailure,
    /// Wall-clock budget exceeded.
    Timeout,
    /// Explicit cancellation or shutdown.
    Cancelled,
    /// Security-policy rejection.
    PolicyDenied,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::BackendFailure => "backend_failure",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::PolicyDenied => "policy_denied",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A user-visible failure: kind, human message, and (for `BackendFailure`)
/// the backend's own error text verbatim.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_detail: Option<String>,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), backend_detail: None }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapacityExceeded, message)
    }

    pub fn backend_failure(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BackendFailure,
            message: message.into(),
            backend_detail: Some(detail.into()),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn policy_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PolicyDenied, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
