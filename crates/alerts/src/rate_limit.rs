// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-window, per-instance alert rate limiter. Window arithmetic is
//! pure memory and serialized on a single lock.

use bastion_core::{Clock, InstanceId, RateLimitWindow};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_alerts: i64,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_alerts: 5, window_seconds: 60 }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub suppressed_count: u32,
    pub reason: String,
}

pub struct RateLimiter<C: Clock> {
    config: RateLimitConfig,
    windows: Mutex<HashMap<InstanceId, RateLimitWindow>>,
    clock: C,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(config: RateLimitConfig, clock: C) -> Self {
        Self { config, windows: Mutex::new(HashMap::new()), clock }
    }

    /// `maxAlerts <= 0` always allows. Otherwise rolls the window if it has
    /// expired, then admits or suppresses against `maxAlerts`.
    pub fn should_allow(&self, instance_id: InstanceId) -> RateLimitDecision {
        if self.config.max_alerts <= 0 {
            return RateLimitDecision { allowed: true, suppressed_count: 0, reason: String::new() };
        }

        let now = self.clock.epoch_ms();
        let window_ms = self.config.window_seconds * 1000;
        let mut windows = self.windows.lock();
        let window = windows.entry(instance_id).or_insert(RateLimitWindow {
            window_start_epoch_ms: now,
            count: 0,
            suppressed_count: 0,
        });

        if now.saturating_sub(window.window_start_epoch_ms) >= window_ms {
            window.window_start_epoch_ms = now;
            window.count = 0;
            window.suppressed_count = 0;
        }

        if window.count >= self.config.max_alerts as u32 {
            window.suppressed_count += 1;
            return RateLimitDecision {
                allowed: false,
                suppressed_count: window.suppressed_count,
                reason: format!(
                    "instance {instance_id} exceeded {} alerts in {}s window",
                    self.config.max_alerts, self.config.window_seconds
                ),
            };
        }

        window.count += 1;
        RateLimitDecision { allowed: true, suppressed_count: 0, reason: String::new() }
    }

    /// Evicts windows older than `2 * windowSeconds`. Intended to be called
    /// from a 5-minute background sweep.
    pub fn sweep(&self) {
        let now = self.clock.epoch_ms();
        let stale_after_ms = 2 * self.config.window_seconds * 1000;
        self.windows.lock().retain(|_, window| now.saturating_sub(window.window_start_epoch_ms) < stale_after_ms);
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
