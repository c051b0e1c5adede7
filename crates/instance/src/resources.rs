// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-flight resource check run before a process is handed to the
//! supervisor.

use bastion_core::{CoreError, HostMemory, ServiceInstance};

/// `required = memoryLimit / 2^20`. `available = host.available - reserved
/// - buffer`, where `buffer` is 10% of total host memory. On insufficiency,
/// builds a suggestion list: running instances sorted by memory limit
/// descending, accumulated until the shortfall is covered.
pub fn preflight_memory_check(
    host: &dyn HostMemory,
    memory_limit_bytes: u64,
    reserved_mb: u64,
    running: &[ServiceInstance],
) -> Result<(), CoreError> {
    let required_mb = memory_limit_bytes / (1024 * 1024);
    let total_mb = host.total_mb();
    let buffer_mb = total_mb / 10;
    let available_mb = host.available_mb().saturating_sub(reserved_mb).saturating_sub(buffer_mb);

    if available_mb >= required_mb {
        return Ok(());
    }

    let shortfall = required_mb - available_mb;
    let mut candidates: Vec<&ServiceInstance> =
        running.iter().filter(|i| i.memory_limit.is_some()).collect();
    candidates.sort_by(|a, b| b.memory_limit.cmp(&a.memory_limit));

    let mut freed = 0u64;
    let mut suggestions = Vec::new();
    for instance in candidates {
        if freed >= shortfall {
            break;
        }
        let limit_mb = instance.memory_limit.unwrap_or(0) / (1024 * 1024);
        freed += limit_mb;
        suggestions.push(format!("  - stop {} (frees ~{limit_mb} MB)", instance.name));
    }

    let mut message = format!(
        "insufficient memory: required {required_mb} MB, available {available_mb} MB"
    );
    if !suggestions.is_empty() {
        message.push_str("\nsuggestions:\n");
        message.push_str(&suggestions.join("\n"));
    }
    Err(CoreError::ResourceInsufficient(message))
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
