// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal per-agent state: the mutable record a monitor and the manager's
//! control calls both touch, plus the bounded event queue it owns.
//!
//! Per §5's shared-resource policy, a record's internal invariants hold
//! because only one of {that agent's monitor, an explicit control call}
//! ever mutates it at a time -- enforced here with a single [`Mutex`]
//! rather than by convention.

use crate::queue::EventQueue;
use oj_core::{AgentConfig, AgentId, AgentInfo, AgentStatus, Event, EventType, RunId};
use oj_providers::TaskId;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

pub(crate) struct AgentState {
    pub status: AgentStatus,
    pub current_run_id: Option<RunId>,
    pub current_task_id: Option<TaskId>,
    pub last_activity: Option<String>,
    pub error_message: Option<String>,
}

pub(crate) struct AgentHandle {
    pub id: AgentId,
    pub config: AgentConfig,
    pub created_at: String,
    pub sandbox_path: PathBuf,
    pub state: Mutex<AgentState>,
    pub queue: EventQueue,
    /// The currently running monitor task, if any -- checked by the zombie
    /// sweeper against `state.status == Running`.
    pub monitor: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl AgentHandle {
    pub fn new(
        id: AgentId,
        config: AgentConfig,
        sandbox_path: PathBuf,
        created_at: String,
        queue_capacity: usize,
    ) -> Self {
        Self {
            id,
            config,
            created_at,
            sandbox_path,
            state: Mutex::new(AgentState {
                status: AgentStatus::Created,
                current_run_id: None,
                current_task_id: None,
                last_activity: None,
                error_message: None,
            }),
            queue: EventQueue::new(queue_capacity),
            monitor: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.sandbox_path.join("workspace")
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    /// Pushes an event onto this agent's bounded queue. A disposed agent
    /// never gets another event (invariant #2, §8).
    pub fn push_event(&self, event_type: EventType, run_id: Option<RunId>, payload: Value, now: String) {
        if self.is_disposed() {
            return;
        }
        let event =
            Event::new(event_type, self.id.clone(), run_id.map(|r| r.to_string()), payload, now);
        self.queue.push(event);
    }

    /// Finalizes a run iff `run_id` is still the agent's current run --
    /// lets [`crate::manager::AgentManager::cancel_task`] and a racing
    /// monitor both call this without double-transitioning the agent.
    /// Returns whether this call actually performed the transition.
    pub fn finish_run(&self, run_id: &RunId, status: AgentStatus, error: Option<String>, now: String) -> bool {
        let mut state = self.state.lock();
        if state.current_run_id.as_ref() != Some(run_id) {
            return false;
        }
        state.status = status;
        state.current_run_id = None;
        state.current_task_id = None;
        state.error_message = error;
        state.last_activity = Some(now);
        true
    }

    pub fn touch_activity(&self, now: String) {
        self.state.lock().last_activity = Some(now);
    }

    pub fn info(&self) -> AgentInfo {
        let state = self.state.lock();
        AgentInfo {
            agent_id: self.id.clone(),
            config: self.config.clone(),
            status: state.status,
            created_at: self.created_at.clone(),
            last_activity: state.last_activity.clone(),
            current_run_id: state.current_run_id.clone(),
            error_message: state.error_message.clone(),
        }
    }
}
