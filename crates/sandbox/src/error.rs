// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by the sandbox manager (C2).
//!
//! Per §4.2, routine denials (quota exceeded, path rejected) are plain
//! `bool`/`Ok(false)` results, never errors. [`SandboxError`] is reserved
//! for the catastrophic cases the spec allows to bubble up: filesystem
//! failures the manager cannot route around.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox not found for agent {0}")]
    NotFound(String),

    #[error("failed to create sandbox directory {path}: {source}")]
    Create { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to remove sandbox directory {path}: {source}")]
    Remove { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to stat sandbox directory {path}: {source}")]
    Stat { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to enumerate base directory {path}: {source}")]
    Scan { path: PathBuf, #[source] source: std::io::Error },
}
