// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: best-effort publish, at-least-once in-process delivery to
//! subscribers.

use crate::event::Event;
use tokio::sync::broadcast;

/// Implementations fan out `publish` to every live `subscribe()` receiver.
/// No cross-subscriber ordering is guaranteed; a single subscriber sees
/// events in publish order.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: Event);
    fn subscribe(&self) -> broadcast::Receiver<Event>;
}
