// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider kind and per-kind configuration (§9's "abstract-class hierarchy
//! of providers -> tagged-union" redesign). Dispatch is always by kind,
//! never by subclass.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which backend a provider talks to. New backends are added here, not by
/// subclassing -- the `Provider` trait stays uniform across all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Local `claude` CLI, spawned as a subprocess per task.
    ClaudeCode,
    /// Local `gemini` CLI, spawned as a subprocess per task.
    GeminiCode,
    /// Local Ollama model server, reached over HTTP.
    Ollama,
    /// Remote OpenAI-compatible chat completions API.
    OpenAi,
    /// Remote Gemini chat API.
    Gemini,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude_code",
            Self::GeminiCode => "gemini_code",
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Whether this kind is archetype A (subprocess) or B (HTTP), per §4.4.
    pub fn is_subprocess(self) -> bool {
        matches!(self, Self::ClaudeCode | Self::GeminiCode)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude_code" => Ok(Self::ClaudeCode),
            "gemini_code" => Ok(Self::GeminiCode),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown provider kind: {other}")),
        }
    }
}

/// Configuration for a subprocess-backed provider (archetype A).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprocessConfig {
    pub binary_path: PathBuf,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

/// Configuration for an HTTP-backed provider (archetype B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

/// Opaque per-provider configuration blob, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    ClaudeCode(SubprocessConfig),
    GeminiCode(SubprocessConfig),
    Ollama(HttpConfig),
    OpenAi(HttpConfig),
    Gemini(HttpConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::ClaudeCode(_) => ProviderKind::ClaudeCode,
            Self::GeminiCode(_) => ProviderKind::GeminiCode,
            Self::Ollama(_) => ProviderKind::Ollama,
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::Gemini(_) => ProviderKind::Gemini,
        }
    }
}
