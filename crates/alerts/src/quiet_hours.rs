// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed in-memory `QuietHours` implementation: defers notifications below
//! a configured severity threshold into a queue instead of dispatching them.

use async_trait::async_trait;
use bastion_core::{AlertSeverity, CoreError, Notification, QuietHours};
use parking_lot::Mutex;

/// Severities strictly below `queue_below` are queued; `queue_below` and
/// above dispatch immediately.
pub struct ThresholdQuietHours {
    queue_below: AlertSeverity,
    queued: Mutex<Vec<Notification>>,
}

impl ThresholdQuietHours {
    pub fn new(queue_below: AlertSeverity) -> Self {
        Self { queue_below, queued: Mutex::new(Vec::new()) }
    }

    /// Never queues anything: every severity dispatches immediately.
    pub fn always_dispatch() -> Self {
        // AlertSeverity::Info is the lowest variant, so nothing is ever < it.
        Self::new(AlertSeverity::Info)
    }

    /// Drains and returns everything queued so far, in enqueue order.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut self.queued.lock())
    }

    pub fn len(&self) -> usize {
        self.queued.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.lock().is_empty()
    }
}

#[async_trait]
impl QuietHours for ThresholdQuietHours {
    async fn should_queue(&self, severity: AlertSeverity) -> bool {
        severity < self.queue_below
    }

    async fn enqueue(&self, notification: Notification) -> Result<(), CoreError> {
        self.queued.lock().push(notification);
        Ok(())
    }
}

#[cfg(test)]
#[path = "quiet_hours_tests.rs"]
mod tests;
