// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pending_requires_level_below_max_and_next_time() {
    let ok = AlertEscalation::builder()
        .current_level(1)
        .max_level(3)
        .status(EscalationStatus::Pending)
        .next_escalation_at_epoch_ms(1000)
        .build();
    assert!(ok.invariant_holds());

    let bad = AlertEscalation::builder()
        .current_level(3)
        .max_level(3)
        .status(EscalationStatus::Pending)
        .next_escalation_at_epoch_ms(1000)
        .build();
    assert!(!bad.invariant_holds());
}

#[test]
fn max_reached_requires_level_equal_and_no_next_time() {
    let ok = AlertEscalation::builder()
        .current_level(3)
        .max_level(3)
        .status(EscalationStatus::MaxReached)
        .build();
    assert!(ok.invariant_holds());

    let bad = AlertEscalation::builder()
        .current_level(3)
        .max_level(3)
        .status(EscalationStatus::MaxReached)
        .next_escalation_at_epoch_ms(1000)
        .build();
    assert!(!bad.invariant_holds());
}
