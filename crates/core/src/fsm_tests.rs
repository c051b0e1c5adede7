// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::InstanceState::*;

#[test]
fn every_non_terminal_state_has_a_failed_edge() {
    for state in [Installing, Starting, Running, Stopping] {
        assert!(can_transition(state, Failed), "{state:?} should be able to fail");
    }
}

#[test]
fn deleting_is_terminal() {
    assert!(allowed_destinations(Deleting).is_empty());
    assert!(!can_transition(Deleting, Installing));
}

#[test]
fn stopped_can_restart_or_delete_or_fail() {
    assert!(can_transition(Stopped, Starting));
    assert!(can_transition(Stopped, Deleting));
    assert!(can_transition(Stopped, Failed));
    assert!(!can_transition(Stopped, Running));
}

#[test]
fn skipping_states_is_rejected() {
    assert!(!can_transition(Installing, Running));
    assert!(!can_transition(Installed, Running));
}

#[test]
fn failed_can_restart_or_delete_but_not_fail_again() {
    assert!(can_transition(Failed, Starting));
    assert!(can_transition(Failed, Deleting));
    assert!(!can_transition(Failed, Failed));
}
