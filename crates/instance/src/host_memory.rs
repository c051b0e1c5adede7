// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`HostMemory`] implementations: a real `sysinfo`-backed reader and, under
//! `test-support`, a fixed-value fake.

use bastion_core::HostMemory;
use sysinfo::System;

/// Reads live host memory via `sysinfo`. Refreshes on every call — these
/// reads happen at most once per start attempt, not on a hot path.
pub struct SysinfoHostMemory;

impl SysinfoHostMemory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SysinfoHostMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl HostMemory for SysinfoHostMemory {
    fn total_mb(&self) -> u64 {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.total_memory() / (1024 * 1024)
    }

    fn available_mb(&self) -> u64 {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.available_memory() / (1024 * 1024)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Copy)]
pub struct FakeHostMemory {
    pub total_mb: u64,
    pub available_mb: u64,
}

#[cfg(any(test, feature = "test-support"))]
impl HostMemory for FakeHostMemory {
    fn total_mb(&self) -> u64 {
        self.total_mb
    }

    fn available_mb(&self) -> u64 {
        self.available_mb
    }
}

#[cfg(test)]
#[path = "host_memory_tests.rs"]
mod tests;
