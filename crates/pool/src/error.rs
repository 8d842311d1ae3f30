// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The manager's error enum, embedding every subsystem it builds on via
//! `#[from]` so the transport layer can map a single type to §6 status
//! codes, per the layered error design in §7.

use oj_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("agent or run not found: {0}")]
    NotFound(String),

    #[error("the concurrent-agent ceiling has been reached")]
    CapacityExceeded,

    #[error("agent is not in a valid state for this operation: {0}")]
    InvalidState(String),

    #[error("policy denied: {0}")]
    PolicyDenied(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] oj_sandbox::SandboxError),

    #[error("provider error: {0}")]
    Provider(#[from] oj_providers::ProviderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Maps to the stable cross-subsystem kind the transport uses to pick
    /// an HTTP status code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::CapacityExceeded => ErrorKind::CapacityExceeded,
            Self::InvalidState(_) => ErrorKind::Validation,
            Self::PolicyDenied(_) => ErrorKind::PolicyDenied,
            Self::Sandbox(_) => ErrorKind::Internal,
            Self::Provider(oj_providers::ProviderError::Timeout) => ErrorKind::Timeout,
            Self::Provider(oj_providers::ProviderError::Cancelled) => ErrorKind::Cancelled,
            Self::Provider(_) => ErrorKind::BackendFailure,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
