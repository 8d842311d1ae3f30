// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archetype A: subprocess-backed providers (local CLI), per §4.4.
//!
//! Spawns the backend binary per task with the sandbox as its working
//! directory, pipes stdout line-by-line (parsed as JSON or treated as an
//! opaque log line by the caller), and collects stderr for post-mortem
//! reporting. Streaming forwards each decoded line as a [`Chunk`].
//! Cancellation sends `SIGTERM`, waits up to 5s, then `SIGKILL`s.

use crate::error::ProviderError;
use crate::kind::{ProviderKind, SubprocessConfig};
use crate::model::{Chunk, HealthState, HealthStatus, Response, Task, TaskId, TaskStatus};
use crate::provider::{ChunkStream, Provider};
use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const FORCE_KILL_GRACE: Duration = Duration::from_secs(5);
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Subprocess-backed provider for a local CLI (Claude Code, Gemini Code, ...).
pub struct SubprocessProvider {
    kind: ProviderKind,
    config: SubprocessConfig,
    live: Arc<Mutex<HashMap<TaskId, u32>>>,
}

impl SubprocessProvider {
    pub fn new(kind: ProviderKind, config: SubprocessConfig) -> Self {
        Self { kind, config, live: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn build_command(&self, task: &Task) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.args(&self.config.extra_args);
        cmd.arg("--model").arg(&task.model);
        if task.resume_session {
            cmd.arg("--resume");
        }
        for tool in &task.tools {
            cmd.arg("--allow-tool").arg(tool);
        }
        cmd.current_dir(&task.workspace);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Racing the process against the timeout timer (§4.4) drops this
        // future on expiry; without this the child would otherwise leak
        // as an orphan instead of being reaped.
        cmd.kill_on_drop(true);
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        for (key, value) in &task.env {
            cmd.env(key, value);
        }
        cmd
    }

    async fn terminate(&self, task_id: &TaskId) -> bool {
        let pid = match self.live.lock().get(task_id).copied() {
            Some(pid) => pid,
            None => return false,
        };
        let nix_pid = Pid::from_raw(pid as i32);
        let _ = kill(nix_pid, Signal::SIGTERM);

        let deadline = tokio::time::Instant::now() + FORCE_KILL_GRACE;
        loop {
            if !self.live.lock().contains_key(task_id) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let _ = kill(nix_pid, Signal::SIGKILL);
        self.live.lock().remove(task_id);
        true
    }
}

#[async_trait]
impl Provider for SubprocessProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn required_config_keys(&self) -> &'static [&'static str] {
        &["binary_path"]
    }

    /// Hardcoded fallback ids, recovered from the original CLI providers'
    /// shipped model lists; used before any dynamic lookup has run.
    fn available_models(&self) -> Vec<String> {
        match self.kind {
            ProviderKind::ClaudeCode => {
                vec!["claude-3-5-sonnet-20241022".into(), "claude-3-opus-20240229".into()]
            }
            ProviderKind::GeminiCode => vec!["gemini-1.5-pro".into(), "gemini-1.5-flash".into()],
            _ => Vec::new(),
        }
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        if !self.config.binary_path.exists() {
            // Still allow a bare command name resolved via PATH.
            let is_bare_name = self.config.binary_path.components().count() == 1;
            if !is_bare_name {
                return Err(ProviderError::ConfigMissing(format!(
                    "binary not found: {}",
                    self.config.binary_path.display()
                )));
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match Command::new(&self.config.binary_path).arg("--version").output().await {
            Ok(output) if output.status.success() => {
                HealthStatus { status: HealthState::Healthy, details: "binary responded to --version".into() }
            }
            Ok(output) => HealthStatus {
                status: HealthState::Unhealthy,
                details: format!("--version exited with {}", output.status),
            },
            Err(e) => HealthStatus { status: HealthState::Unknown, details: e.to_string() },
        }
    }

    async fn list_models(&self) -> Vec<String> {
        // Subprocess CLIs don't expose a models endpoint; the agent config
        // supplies the model id directly. An empty list signals "ask the
        // caller", matching the transient-error fallback in §4.3.
        Vec::new()
    }

    async fn execute(&self, task: Task) -> Result<Response, ProviderError> {
        let mut stream = self.stream(task).await;
        let mut content = String::new();
        let mut terminal = Response::failed("no terminal chunk received");
        use futures::StreamExt;
        while let Some(chunk) = stream.next().await {
            content.push_str(&chunk.content);
            if chunk.done {
                terminal = match (chunk.status, chunk.error) {
                    (Some(TaskStatus::Completed), _) => Response::completed(content.clone()),
                    (Some(TaskStatus::Cancelled), _) => Response::cancelled(),
                    (_, Some(err)) => Response::failed(err),
                    _ => Response::failed("unknown terminal status"),
                };
                break;
            }
        }
        Ok(terminal)
    }

    async fn stream(&self, task: Task) -> ChunkStream {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let mut cmd = self.build_command(&task);
        let task_id = task.id.clone();
        let live = self.live.clone();
        let prompt = task.prompt.clone();
        let timeout = task.timeout;

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let _ = tx.send(Chunk::failed(format!("failed to spawn: {e}"))).await;
                return Box::pin(ReceiverStream::new(rx));
            }
        };

        tokio::spawn(run_and_stream(child, task_id, prompt, timeout, live, tx));
        Box::pin(ReceiverStream::new(rx))
    }

    async fn cancel(&self, task_id: &TaskId) -> bool {
        self.terminate(task_id).await
    }

    async fn cleanup(&self) {
        let ids: Vec<TaskId> = self.live.lock().keys().cloned().collect();
        for id in ids {
            self.terminate(&id).await;
        }
    }
}

async fn run_and_stream(
    mut child: tokio::process::Child,
    task_id: TaskId,
    prompt: String,
    timeout: Duration,
    live: Arc<Mutex<HashMap<TaskId, u32>>>,
    tx: mpsc::Sender<Chunk>,
) {
    if let Some(pid) = child.id() {
        live.lock().insert(task_id.clone(), pid);
    }

    if let Some(mut stdin) = child.stdin.take() {
        use tokio::io::AsyncWriteExt;
        let _ = stdin.write_all(prompt.as_bytes()).await;
        let _ = stdin.shutdown().await;
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let read_and_wait = async {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(Chunk::data(line)).await.is_err() {
                    break;
                }
            }
        }
        let mut stderr_text = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut stderr_text).await;
        }
        (child.wait().await, stderr_text)
    };

    let outcome = tokio::time::timeout(timeout, read_and_wait).await;
    live.lock().remove(&task_id);

    match outcome {
        Ok((Ok(status), _)) if status.success() => {
            let _ = tx.send(Chunk::done(TaskStatus::Completed)).await;
        }
        Ok((Ok(status), stderr_text)) => {
            let _ = tx
                .send(Chunk::failed(format!("exit status {status}: {}", stderr_text.trim())))
                .await;
        }
        Ok((Err(e), _)) => {
            let _ = tx.send(Chunk::failed(format!("wait failed: {e}"))).await;
        }
        Err(_) => {
            let _ = tx.send(Chunk::failed("task exceeded its timeout")).await;
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
