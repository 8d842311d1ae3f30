// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced at the provider boundary (C3/C4), per §4.3's error
//! column and §7's taxonomy. Providers convert *backend*-specific failures
//! into these variants at their own boundary -- nothing upstream of a
//! provider ever sees a raw subprocess exit code or HTTP status directly.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("provider configuration missing or invalid: {0}")]
    ConfigMissing(String),

    #[error("failed to reach backend: {0}")]
    ConnectivityFailed(String),

    #[error("task exceeded its timeout")]
    Timeout,

    #[error("backend returned an error: {0}")]
    BackendFailure(String),

    #[error("task was cancelled")]
    Cancelled,

    #[error("provider is not initialized")]
    NotInitialized,

    #[error("unknown provider kind: {0}")]
    UnknownKind(String),
}
