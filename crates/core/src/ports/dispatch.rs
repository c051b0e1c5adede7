// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification dispatcher: fan-out to channels, returning per-channel
//! results.

use crate::model::{AlertId, AlertSeverity};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Notification {
    pub channel_id: String,
    pub alert_id: AlertId,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub event_type: String,
    pub channels: Vec<String>,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ChannelResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        notification: Notification,
        cancel: CancellationToken,
    ) -> Vec<ChannelResult>;
}

/// Defers low-severity notifications.
#[async_trait]
pub trait QuietHours: Send + Sync {
    /// Returns `true` when the notification should be queued instead of
    /// dispatched immediately.
    async fn should_queue(&self, severity: AlertSeverity) -> bool;
    async fn enqueue(&self, notification: Notification) -> Result<(), crate::error::CoreError>;
}
