// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bastion-alerts: turns raw service events into fired, rate-limited,
//! quiet-hours-aware alerts, and runs the persistent per-alert escalation
//! ladder on top of them.

mod bridge;
mod escalation;
mod quiet_hours;
mod rate_limit;

#[cfg(any(test, feature = "test-support"))]
mod fakes;

pub use bridge::AlertBridge;
pub use escalation::{EscalationConfig, EscalationEngine};
pub use quiet_hours::ThresholdQuietHours;
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter};

#[cfg(any(test, feature = "test-support"))]
pub use fakes::{FakeEventBus, FakeNotificationDispatcher};
