// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::kind::SubprocessConfig;
use crate::model::{Task, TaskStatus};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn shell_provider(script: &str) -> SubprocessProvider {
    SubprocessProvider::new(
        ProviderKind::ClaudeCode,
        SubprocessConfig {
            binary_path: PathBuf::from("/bin/sh"),
            extra_args: vec!["-c".to_string(), script.to_string()],
            env: vec![],
        },
    )
}

fn task(prompt: &str) -> Task {
    let dir = tempdir().unwrap();
    let mut t = Task::new(prompt, "test-model", dir.path().to_path_buf());
    t.timeout = Duration::from_secs(5);
    std::mem::forget(dir); // keep the tempdir alive for the task's lifetime
    t
}

#[tokio::test]
async fn execute_echoes_prompt_back() {
    let provider = shell_provider("cat");
    let response = provider.execute(task("hello world")).await.unwrap();
    assert_eq!(response.status, TaskStatus::Completed);
    assert_eq!(response.content, "hello world");
}

#[tokio::test]
async fn execute_reports_backend_failure_on_nonzero_exit() {
    let provider = shell_provider("exit 3");
    let response = provider.execute(task("irrelevant")).await.unwrap();
    assert_eq!(response.status, TaskStatus::Failed);
    assert!(response.error.is_some());
}

#[tokio::test]
async fn stream_yields_each_line_then_a_terminal_chunk() {
    let provider = shell_provider("echo line1; echo line2");
    let mut stream = provider.stream(task("unused")).await;

    let first = stream.next().await.unwrap();
    assert_eq!(first.content, "line1");
    assert!(!first.done);

    let second = stream.next().await.unwrap();
    assert_eq!(second.content, "line2");
    assert!(!second.done);

    let terminal = stream.next().await.unwrap();
    assert!(terminal.done);
    assert_eq!(terminal.status, Some(TaskStatus::Completed));
}

#[tokio::test]
async fn malformed_json_chunk_surfaces_as_plain_content_and_stream_continues() {
    let provider = shell_provider("echo 'not json'; echo 'still going'");
    let mut stream = provider.stream(task("unused")).await;

    let first = stream.next().await.unwrap();
    assert_eq!(first.content, "not json");
    let second = stream.next().await.unwrap();
    assert_eq!(second.content, "still going");
    let terminal = stream.next().await.unwrap();
    assert!(terminal.done);
}

#[tokio::test]
async fn cancel_terminates_a_running_task_within_grace_period() {
    let provider = shell_provider("sleep 30");
    let t = task("unused");
    let task_id = t.id.clone();

    let mut stream = provider.stream(t).await;
    // Give the process a moment to actually spawn and register its pid.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let cancelled = provider.cancel(&task_id).await;
    assert!(cancelled);

    let terminal = tokio::time::timeout(Duration::from_secs(6), async {
        loop {
            match stream.next().await {
                Some(chunk) if chunk.done => return chunk,
                Some(_) => continue,
                None => panic!("stream ended without a terminal chunk"),
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(terminal.status, Some(TaskStatus::Failed));
}

#[tokio::test]
async fn cancel_of_unknown_task_is_a_benign_false() {
    let provider = shell_provider("true");
    assert!(!provider.cancel(&crate::model::TaskId::new()).await);
}

#[tokio::test]
async fn timeout_forces_a_failed_terminal_chunk() {
    let provider = shell_provider("sleep 30");
    let mut t = task("unused");
    t.timeout = Duration::from_millis(200);
    let mut stream = provider.stream(t).await;

    let terminal = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match stream.next().await {
                Some(chunk) if chunk.done => return chunk,
                Some(_) => continue,
                None => panic!("stream ended without a terminal chunk"),
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(terminal.status, Some(TaskStatus::Failed));
    assert!(terminal.error.unwrap().contains("timeout"));
}

#[tokio::test]
async fn health_check_reports_unknown_for_missing_binary() {
    let provider = SubprocessProvider::new(
        ProviderKind::ClaudeCode,
        SubprocessConfig {
            binary_path: PathBuf::from("/nonexistent/binary/path"),
            extra_args: vec![],
            env: vec![],
        },
    );
    let status = provider.health_check().await;
    assert_eq!(status.status, HealthState::Unknown);
}

#[tokio::test]
async fn initialize_accepts_a_bare_command_name_resolved_via_path() {
    let provider = SubprocessProvider::new(
        ProviderKind::ClaudeCode,
        SubprocessConfig { binary_path: PathBuf::from("sh"), extra_args: vec![], env: vec![] },
    );
    assert!(provider.initialize().await.is_ok());
}

#[tokio::test]
async fn initialize_rejects_a_missing_absolute_path() {
    let provider = SubprocessProvider::new(
        ProviderKind::ClaudeCode,
        SubprocessConfig {
            binary_path: PathBuf::from("/nonexistent/binary/path"),
            extra_args: vec![],
            env: vec![],
        },
    );
    assert!(provider.initialize().await.is_err());
}
