// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus: a `tokio::sync::broadcast` wrapper implementing
//! [`bastion_core::EventBus`], at-least-once delivery to every subscriber
//! alive when an event is published.

use bastion_core::{Event, EventBus};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

pub struct BroadcastEventBus {
    sender: broadcast::Sender<Event>,
}

impl BroadcastEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for BroadcastEventBus {
    /// No subscribers is not an error: events published before the event
    /// loop task starts are simply lost, same as any broadcast channel.
    fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
