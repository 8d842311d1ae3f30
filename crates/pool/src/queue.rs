// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent bounded event queue (§5's shared-resource policy).
//!
//! Single-consumer by design: `drain` removes events, so concurrent
//! subscribers to the same agent split the stream rather than each seeing
//! every event. Overflow never drops `TaskStart`/`TaskComplete`/`Error` --
//! the oldest `Log` is discarded first; only if no `Log` entry exists does
//! the oldest entry of any type give way.

use oj_core::{Event, EventType};
use parking_lot::Mutex;
use std::collections::VecDeque;

pub struct EventQueue {
    capacity: usize,
    inner: Mutex<VecDeque<Event>>,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), inner: Mutex::new(VecDeque::new()) }
    }

    pub fn push(&self, event: Event) {
        let mut queue = self.inner.lock();
        if queue.len() >= self.capacity {
            if let Some(pos) = queue.iter().position(|e| e.event_type == EventType::Log) {
                queue.remove(pos);
            } else {
                queue.pop_front();
            }
        }
        queue.push_back(event);
    }

    /// Removes and returns every event currently queued.
    pub fn drain(&self) -> Vec<Event> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
