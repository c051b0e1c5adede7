// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `EventBus` and `NotificationDispatcher` stand-ins for
//! exercising the escalation engine and bridge without daemon wiring.

#![cfg(any(test, feature = "test-support"))]

use async_trait::async_trait;
use bastion_core::{ChannelResult, Event, EventBus, Notification, NotificationDispatcher};
use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

pub struct FakeEventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for FakeEventBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

impl EventBus for FakeEventBus {
    fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

/// Records every dispatched notification. `fail_channel` forces a specific
/// channel id to report failure on every future dispatch, to exercise the
/// "a channel failure does not cancel the ladder" behavior.
#[derive(Default)]
pub struct FakeNotificationDispatcher {
    dispatched: Mutex<Vec<Notification>>,
    failing_channels: Mutex<HashSet<String>>,
}

impl FakeNotificationDispatcher {
    pub fn fail_channel(&self, channel: impl Into<String>) {
        self.failing_channels.lock().insert(channel.into());
    }

    pub fn dispatched(&self) -> Vec<Notification> {
        self.dispatched.lock().clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched.lock().len()
    }
}

#[async_trait]
impl NotificationDispatcher for FakeNotificationDispatcher {
    async fn dispatch(&self, notification: Notification, _cancel: CancellationToken) -> Vec<ChannelResult> {
        let failing = self.failing_channels.lock().clone();
        let results = notification
            .channels
            .iter()
            .map(|channel| {
                if failing.contains(channel) {
                    ChannelResult { channel: channel.clone(), success: false, error: Some("forced failure".to_string()) }
                } else {
                    ChannelResult { channel: channel.clone(), success: true, error: None }
                }
            })
            .collect();
        self.dispatched.lock().push(notification);
        results
    }
}
