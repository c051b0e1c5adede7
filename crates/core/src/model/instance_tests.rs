// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn builder_produces_installing_by_default() {
    let instance = ServiceInstance::builder().build();
    assert_eq!(instance.status, InstanceState::Installing);
    assert!(instance.ports.is_empty());
}

#[test]
fn terminal_only_when_deleting() {
    let mut instance = ServiceInstance::builder().status(InstanceState::Running).build();
    assert!(!instance.is_terminal());
    instance.status = InstanceState::Deleting;
    assert!(instance.is_terminal());
}

#[test]
fn display_matches_lowercase_name() {
    assert_eq!(InstanceState::Running.to_string(), "running");
    assert_eq!(InstanceState::Failed.to_string(), "failed");
}
