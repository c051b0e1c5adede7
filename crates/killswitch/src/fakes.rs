// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `EventBus` stand-in for exercising the kill-switch manager and
//! listener without daemon wiring.

#![cfg(test)]

use bastion_core::{Event, EventBus};
use tokio::sync::broadcast;

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
