// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bastion_core::FakeClock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

struct FlakyHandler {
    fail_times: AtomicU32,
    calls: AtomicU32,
}

impl FlakyHandler {
    fn new(fail_times: u32) -> Self {
        Self { fail_times: AtomicU32::new(fail_times), calls: AtomicU32::new(0) }
    }
}

#[async_trait]
impl CleanupHandler for FlakyHandler {
    async fn handle(&self, _task: &CleanupTask) -> Result<(), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_times.load(Ordering::SeqCst) > 0 {
            self.fail_times.fetch_sub(1, Ordering::SeqCst);
            return Err(CoreError::ExternalFailure("not yet".into()));
        }
        Ok(())
    }
}

fn task() -> CleanupTask {
    CleanupTask::RouterDeleted { router_id: RouterId::new() }
}

#[tokio::test]
async fn succeeds_immediately_and_drains_queue() {
    let handler = Arc::new(FlakyHandler::new(0));
    let clock = FakeClock::new();
    let queue = CleanupQueue::new(handler.clone(), clock, 16);
    queue.enqueue(task());

    queue.tick().await;

    assert!(queue.is_empty());
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_after_backoff_then_succeeds() {
    let handler = Arc::new(FlakyHandler::new(1));
    let clock = FakeClock::new();
    let queue = CleanupQueue::new(handler.clone(), clock.clone(), 16);
    queue.enqueue(task());

    queue.tick().await;
    assert_eq!(queue.len(), 1);

    // backoff has not elapsed yet
    queue.tick().await;
    assert_eq!(queue.len(), 1);

    clock.advance(Duration::from_millis(DEFAULT_RETRY_DELAY_MS));
    queue.tick().await;

    assert!(queue.is_empty());
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn drops_task_after_exhausting_retry_budget() {
    let handler = Arc::new(FlakyHandler::new(100));
    let clock = FakeClock::new();
    let queue = CleanupQueue::new(handler.clone(), clock.clone(), 16);
    queue.enqueue(task());

    for _ in 0..DEFAULT_MAX_RETRIES {
        queue.tick().await;
        clock.advance(Duration::from_millis(DEFAULT_RETRY_DELAY_MS));
    }

    assert!(queue.is_empty());
    assert_eq!(handler.calls.load(Ordering::SeqCst), DEFAULT_MAX_RETRIES);
}

#[tokio::test]
async fn enqueue_drops_oldest_when_at_capacity() {
    let handler = Arc::new(FlakyHandler::new(0));
    let clock = FakeClock::new();
    let queue = CleanupQueue::new(handler, clock, 1);
    queue.enqueue(task());
    queue.enqueue(task());
    assert_eq!(queue.len(), 1);
}
