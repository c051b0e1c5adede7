// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry queue for the store-disconnect / router-deletion pattern —
//! the one place this system tolerates eventual consistency. Tasks are
//! idempotent; a task that exhausts its retry budget is logged and dropped
//! rather than retried forever.

use async_trait::async_trait;
use bastion_core::{Clock, CoreError, RouterId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, warn};

const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_RETRY_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupTask {
    StorageDisconnected { router_id: RouterId, path_prefix: String },
    StorageReconnected { router_id: RouterId, path_prefix: String },
    RouterDeleted { router_id: RouterId },
}

/// Performs the side-effecting half of a [`CleanupTask`]; implemented by
/// whatever owns the instance manager and kill-switch coordinator, since
/// this queue only sequences retries and doesn't know their internals.
#[async_trait]
pub trait CleanupHandler: Send + Sync {
    async fn handle(&self, task: &CleanupTask) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
struct QueuedTask {
    task: CleanupTask,
    attempts: u32,
    next_attempt_at_epoch_ms: u64,
}

/// Bounded, idempotent-task retry queue, ticked externally on a fixed
/// cadence (10s in production).
pub struct CleanupQueue<C: Clock> {
    handler: Arc<dyn CleanupHandler>,
    clock: C,
    capacity: usize,
    max_retries: u32,
    retry_delay_ms: u64,
    queue: Mutex<VecDeque<QueuedTask>>,
}

impl<C: Clock> CleanupQueue<C> {
    pub fn new(handler: Arc<dyn CleanupHandler>, clock: C, capacity: usize) -> Self {
        Self {
            handler,
            clock,
            capacity,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Enqueues a task, dropping the oldest queued task if at capacity —
    /// this queue favors recent signals over a perfect backlog.
    pub fn enqueue(&self, task: CleanupTask) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            warn!("cleanup queue at capacity ({}), dropping oldest task", self.capacity);
            queue.pop_front();
        }
        queue.push_back(QueuedTask { task, attempts: 0, next_attempt_at_epoch_ms: 0 });
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Drains and retries every task whose backoff has elapsed.
    pub async fn tick(&self) {
        let now = self.clock.epoch_ms();
        let ready: Vec<QueuedTask> = {
            let mut queue = self.queue.lock();
            let mut ready = Vec::new();
            let mut remaining = VecDeque::new();
            for queued in queue.drain(..) {
                if queued.next_attempt_at_epoch_ms <= now {
                    ready.push(queued);
                } else {
                    remaining.push_back(queued);
                }
            }
            *queue = remaining;
            ready
        };

        for mut queued in ready {
            match self.handler.handle(&queued.task).await {
                Ok(()) => {}
                Err(err) => {
                    queued.attempts += 1;
                    if queued.attempts >= self.max_retries {
                        error!(task = ?queued.task, attempts = queued.attempts, %err, "cleanup task exhausted its retry budget, dropping");
                    } else {
                        queued.next_attempt_at_epoch_ms = now + self.retry_delay_ms;
                        self.queue.lock().push_back(queued);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
