// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent lifecycle manager (C6) -- §4.6's eight operations, wired to
//! the policy, sandbox, and provider-registry components.

use crate::error::PoolError;
use crate::handle::AgentHandle;
use futures::StreamExt;
use indexmap::IndexMap;
use oj_core::{AgentConfig, AgentId, AgentInfo, AgentStatus, Clock, Event, EventType, RunId, TaskOptions};
use oj_policy::SecurityPolicy;
use oj_providers::{Chunk, ProviderKind, ProviderRegistry, Task as ProviderTask, TaskStatus as ProviderTaskStatus};
use oj_sandbox::SandboxManager;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// An event drained from [`AgentManager::stream_events`], alongside whether
/// the agent was still live when it was produced. Exists only so the
/// reference transport can distinguish "caught up, nothing more will come"
/// from "still running" without a second round-trip.
pub type PoolEvent = Event;

const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;
const ZOMBIE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const STREAM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The bounded pool of agent handles. One instance is owned by the server
/// root and passed explicitly to handlers (§9's "global singleton ->
/// explicit value" redesign).
pub struct AgentManager<C: Clock = oj_core::SystemClock> {
    policy: Arc<SecurityPolicy>,
    sandbox: Arc<SandboxManager>,
    providers: Arc<ProviderRegistry>,
    clock: C,
    agents: RwLock<IndexMap<AgentId, Arc<AgentHandle>>>,
    event_queue_capacity: usize,
    shutdown: CancellationToken,
}

impl<C: Clock + 'static> AgentManager<C> {
    pub fn new(policy: Arc<SecurityPolicy>, sandbox: Arc<SandboxManager>, providers: Arc<ProviderRegistry>, clock: C) -> Self {
        Self {
            policy,
            sandbox,
            providers,
            clock,
            agents: RwLock::new(IndexMap::new()),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    pub fn live_agent_count(&self) -> usize {
        self.agents.read().len()
    }

    fn get_handle(&self, agent_id: &AgentId) -> Result<Arc<AgentHandle>, PoolError> {
        self.agents
            .read()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| PoolError::NotFound(agent_id.to_string()))
    }

    /// §4.6 `create_agent`: fail at the concurrency ceiling; allocate an
    /// id, provision a sandbox, build the record in `Created`, transition
    /// to `Idle` once the sandbox is in place (§3's lifecycle bullet), and
    /// roll back fully on any mid-creation failure.
    pub fn create_agent(&self, config: AgentConfig) -> Result<AgentId, PoolError> {
        config.provider.parse::<ProviderKind>().map_err(PoolError::InvalidState)?;

        // Optimistic check before any I/O; re-validated under the write
        // lock right before insertion to close the race window.
        if self.agents.read().len() >= self.policy.max_concurrent_agents() {
            return Err(PoolError::CapacityExceeded);
        }

        let id = AgentId::new();
        let sandbox_path = self.sandbox.create_sandbox(&id)?;
        let now = self.clock.now_iso8601();
        let handle = Arc::new(AgentHandle::new(
            id.clone(),
            config,
            sandbox_path,
            now.clone(),
            self.event_queue_capacity,
        ));

        {
            let mut agents = self.agents.write();
            if agents.len() >= self.policy.max_concurrent_agents() {
                drop(agents);
                let _ = self.sandbox.cleanup_sandbox(&id);
                return Err(PoolError::CapacityExceeded);
            }
            agents.insert(id.clone(), handle.clone());
        }

        handle.push_event(EventType::StatusChange, None, json!({"status": "created"}), now.clone());
        handle.state.lock().status = AgentStatus::Idle;
        handle.push_event(EventType::StatusChange, None, json!({"status": "idle"}), self.clock.now_iso8601());

        tracing::info!(agent_id = %id, "agent created");
        Ok(id)
    }

    /// §4.6 `run_task`: merge options, validate against policy, dispatch to
    /// the registered provider, and install the monitor that drains its
    /// chunk stream into this agent's event queue.
    pub async fn run_task(
        &self,
        agent_id: &AgentId,
        prompt: String,
        options: TaskOptions,
    ) -> Result<RunId, PoolError> {
        let handle = self.get_handle(agent_id)?;

        {
            let state = handle.state.lock();
            if matches!(state.status, AgentStatus::Running | AgentStatus::Disposed) {
                return Err(PoolError::InvalidState(format!("agent is {}", state.status)));
            }
        }

        let effective = options.merge_with_config(&handle.config);
        let now = self.clock.now_iso8601();

        for tool in &effective.tools {
            if !self.policy.allow_tool(tool, agent_id) {
                return self.deny_run(&handle, format!("tool not permitted: {tool}"), now);
            }
        }
        if !self.policy.allow_command(&prompt, agent_id) {
            return self.deny_run(&handle, "command matches a dangerous pattern".to_string(), now);
        }

        let kind: ProviderKind = handle
            .config
            .provider
            .parse()
            .map_err(|e: String| PoolError::Internal(e))?;

        let run_id = RunId::new();
        let mut task = ProviderTask::new(prompt, handle.config.model.clone(), handle.workspace_dir());
        task.tools = effective.tools;
        task.timeout = Duration::from_secs(effective.timeout_secs as u64);
        task.max_tokens = effective.max_tokens;
        task.temperature = effective.temperature;
        task.resume_session = effective.resume_session;
        let task_id = task.id.clone();

        {
            let mut state = handle.state.lock();
            state.status = AgentStatus::Running;
            state.current_run_id = Some(run_id.clone());
            state.current_task_id = Some(task_id.clone());
            state.last_activity = Some(now.clone());
        }
        handle.push_event(EventType::TaskStart, Some(run_id.clone()), json!({}), now);

        let providers = self.providers.clone();
        let clock = self.clock.clone();
        let monitor_handle = handle.clone();
        let monitor_run_id = run_id.clone();
        let join = tokio::spawn(async move {
            monitor_run(providers, monitor_handle, clock, kind, task, monitor_run_id).await;
        });
        *handle.monitor.lock() = Some(join);

        Ok(run_id)
    }

    fn deny_run(&self, handle: &AgentHandle, reason: String, now: String) -> Result<RunId, PoolError> {
        tracing::warn!(agent_id = %handle.id, reason = %reason, "task denied by policy");
        handle.push_event(EventType::Error, None, json!({"reason": reason.clone()}), now.clone());
        {
            let mut state = handle.state.lock();
            state.status = AgentStatus::Error;
            state.error_message = Some(reason.clone());
            state.last_activity = Some(now);
        }
        Err(PoolError::PolicyDenied(reason))
    }

    /// §4.6 `cancel_task`: reject (with `false`, not an error) if `run_id`
    /// doesn't match the agent's current run; otherwise signal the
    /// provider and finalize to `Idle` before the monitor's own terminal
    /// push can race it.
    pub async fn cancel_task(&self, agent_id: &AgentId, run_id: &RunId) -> Result<bool, PoolError> {
        let handle = self.get_handle(agent_id)?;

        let task_id = {
            let state = handle.state.lock();
            if state.current_run_id.as_ref() != Some(run_id) {
                return Ok(false);
            }
            match state.current_task_id.clone() {
                Some(id) => id,
                None => return Ok(false),
            }
        };

        let cancelled = self.providers.cancel(&task_id).await;
        let now = self.clock.now_iso8601();
        if handle.finish_run(run_id, AgentStatus::Idle, None, now.clone()) {
            handle.push_event(
                EventType::StatusChange,
                Some(run_id.clone()),
                json!({"status": "idle", "message": "Task cancelled"}),
                now,
            );
        }
        Ok(cancelled)
    }

    /// §4.6 `stream_events`: a blocking, 1-second-poll iterator over one
    /// agent's bounded queue. Single-consumer by design -- a second
    /// concurrent call on the same agent splits the stream rather than
    /// duplicating it; multi-subscriber fan-out is the transport's job.
    pub fn stream_events(&self, agent_id: &AgentId) -> Result<ReceiverStream<Event>, PoolError> {
        let handle = self.get_handle(agent_id)?;
        let shutdown = self.shutdown.clone();
        let (tx, rx) = mpsc::channel(self.event_queue_capacity);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(STREAM_POLL_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        for event in handle.queue.drain() {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        if handle.is_disposed() {
                            return;
                        }
                    }
                    () = shutdown.cancelled() => {
                        for event in handle.queue.drain() {
                            let _ = tx.send(event).await;
                        }
                        return;
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Pure read; does not touch `last_activity` (only a running monitor
    /// does that).
    pub fn get_status(&self, agent_id: &AgentId) -> Result<AgentInfo, PoolError> {
        Ok(self.get_handle(agent_id)?.info())
    }

    pub fn list_agents(&self) -> Vec<AgentInfo> {
        self.agents.read().values().map(|h| h.info()).collect()
    }

    /// §4.6 `dispose_agent`: cancel any active run, reclaim the sandbox,
    /// drop the record, and emit a final `StatusChange`. A second call on
    /// an id already disposed is a plain `NotFound`, not a crash.
    pub async fn dispose_agent(&self, agent_id: &AgentId) -> Result<bool, PoolError> {
        let handle = {
            let mut agents = self.agents.write();
            agents
                .shift_remove(agent_id)
                .ok_or_else(|| PoolError::NotFound(agent_id.to_string()))?
        };

        let active_task = handle.state.lock().current_task_id.clone();
        if let Some(task_id) = active_task {
            self.providers.cancel(&task_id).await;
        }

        let now = self.clock.now_iso8601();
        handle.push_event(EventType::StatusChange, None, json!({"status": "disposed"}), now);
        handle.mark_disposed();

        self.sandbox.cleanup_sandbox(agent_id)?;
        tracing::info!(agent_id = %agent_id, "agent disposed");
        Ok(true)
    }

    /// The background zombie sweeper, per §4.6: any agent marked `Running`
    /// whose monitor task has already finished without clearing the run is
    /// forced to `Error`. Exposed directly (not just via
    /// [`Self::spawn_background_sweeper`]) so tests can drive it without
    /// waiting on the real 5-minute interval.
    pub fn sweep_zombies(&self) -> usize {
        let mut reclaimed = 0usize;
        for handle in self.agents.read().values() {
            let finished = {
                let monitor = handle.monitor.lock();
                monitor.as_ref().is_some_and(|h| h.is_finished())
            };
            if !finished {
                continue;
            }
            let mut state = handle.state.lock();
            if state.status != AgentStatus::Running {
                continue;
            }
            let run_id = state.current_run_id.take();
            state.current_task_id = None;
            state.status = AgentStatus::Error;
            state.error_message = Some("process terminated unexpectedly".to_string());
            let now = self.clock.now_iso8601();
            state.last_activity = Some(now.clone());
            drop(state);
            handle.push_event(EventType::Error, run_id, json!({"reason": "process terminated unexpectedly"}), now);
            tracing::error!(agent_id = %handle.id, "zombie agent reclaimed");
            reclaimed += 1;
        }
        reclaimed
    }

    pub fn sweep_orphans(&self) -> Result<usize, PoolError> {
        Ok(self.sandbox.sweep_orphans()?)
    }

    /// Spawns the combined zombie/orphan sweeper loop. Returns the join
    /// handle so the caller (the server binary) can await it on shutdown.
    pub fn spawn_background_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ZOMBIE_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let zombies = manager.sweep_zombies();
                        if zombies > 0 {
                            tracing::warn!(count = zombies, "zombie sweep reclaimed agents");
                        }
                        match manager.sweep_orphans() {
                            Ok(n) if n > 0 => tracing::info!(count = n, "orphan sandbox sweep reclaimed directories"),
                            Ok(_) => {}
                            Err(e) => tracing::warn!(error = %e, "orphan sandbox sweep failed"),
                        }
                    }
                    () = manager.shutdown.cancelled() => return,
                }
            }
        })
    }

    /// Cancels every live stream-events loop and the background sweeper,
    /// then disposes every remaining agent and shuts down the provider
    /// registry. Per-provider failures during registry shutdown are
    /// absorbed (§4.5) and never block the others.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let ids: Vec<AgentId> = self.agents.read().keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.dispose_agent(&id).await {
                tracing::warn!(agent_id = %id, error = %e, "failed to dispose agent during shutdown");
            }
        }
        self.providers.shutdown().await;
    }
}

/// Drains a provider's chunk stream into the agent's event queue, parsing
/// each non-terminal chunk's content as either a typed event object or an
/// opaque log line (matching the original adapter's "not JSON, or unknown
/// `type` -> log line" fallback, mirrored in [`oj_core::EventType::from_str`]).
async fn monitor_run<C: Clock>(
    providers: Arc<ProviderRegistry>,
    handle: Arc<AgentHandle>,
    clock: C,
    kind: ProviderKind,
    task: ProviderTask,
    run_id: RunId,
) {
    let mut stream = providers.stream(kind, task).await;

    while let Some(chunk) = stream.next().await {
        if chunk.done {
            let (event_type, status, payload) = terminal_outcome(&chunk);
            // Gate the terminal push on `finish_run`'s return: if `run_id`
            // is no longer the agent's current run (e.g. `cancel_task`
            // already finalized it), this chunk is stale and must not
            // reach the queue after the true cancellation event.
            if handle.finish_run(&run_id, status, chunk.error.clone(), clock.now_iso8601()) {
                handle.push_event(event_type, Some(run_id.clone()), payload, clock.now_iso8601());
            }
            return;
        }
        let (event_type, payload) = parse_chunk_line(&chunk);
        handle.push_event(event_type, Some(run_id.clone()), payload, clock.now_iso8601());
        handle.touch_activity(clock.now_iso8601());
    }

    // Defensive: a well-behaved provider always ends with a `done` chunk.
    // If the stream closes without one, treat it as a backend failure
    // rather than leaving the agent stuck in `Running` for the sweeper.
    let now = clock.now_iso8601();
    if handle.finish_run(&run_id, AgentStatus::Error, Some("stream ended without a terminal status".into()), now.clone()) {
        handle.push_event(
            EventType::Error,
            Some(run_id.clone()),
            json!({"reason": "stream ended without a terminal status"}),
            now,
        );
    }
}

fn terminal_outcome(chunk: &Chunk) -> (EventType, AgentStatus, Value) {
    match chunk.status {
        Some(ProviderTaskStatus::Completed) => {
            (EventType::TaskComplete, AgentStatus::Idle, json!({"return_code": 0}))
        }
        Some(ProviderTaskStatus::Cancelled) => {
            (EventType::StatusChange, AgentStatus::Idle, json!({"status": "idle", "message": "Task cancelled"}))
        }
        Some(ProviderTaskStatus::Failed) | None => (
            EventType::Error,
            AgentStatus::Error,
            json!({"reason": chunk.error.clone().unwrap_or_else(|| "task failed".to_string())}),
        ),
    }
}

/// A content chunk is either a JSON object naming a recognised event
/// `type` (surfaced as that event) or anything else, surfaced as a `Log`
/// (covers both opaque CLI log lines and malformed streaming JSON, per
/// §8's boundary behaviour).
fn parse_chunk_line(chunk: &Chunk) -> (EventType, Value) {
    if let Ok(value) = serde_json::from_str::<Value>(&chunk.content) {
        if let Some(type_str) = value.get("type").and_then(|t| t.as_str()) {
            if let Ok(event_type) = type_str.parse::<EventType>() {
                return (event_type, value);
            }
        }
    }
    (EventType::Log, json!({"message": chunk.content}))
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
