// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_host_memory_reports_fixed_values() {
    let fake = FakeHostMemory { total_mb: 2048, available_mb: 512 };
    assert_eq!(fake.total_mb(), 2048);
    assert_eq!(fake.available_mb(), 512);
}
