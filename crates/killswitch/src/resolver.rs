// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing-mark lookup for fallback virtual interfaces, consulted by
//! `fallbackService` Enable. Virtual-interface provisioning lives outside
//! this crate set; this is a narrow read-only lookup rather than a full
//! entity model.

use std::collections::HashMap;

pub trait FallbackInterfaceResolver: Send + Sync {
    fn routing_mark(&self, interface_id: &str) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct StaticFallbackInterfaceResolver(HashMap<String, String>);

impl StaticFallbackInterfaceResolver {
    pub fn new(marks: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(marks.into_iter().collect())
    }
}

impl FallbackInterfaceResolver for StaticFallbackInterfaceResolver {
    fn routing_mark(&self, interface_id: &str) -> Option<String> {
        self.0.get(interface_id).cloned()
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
