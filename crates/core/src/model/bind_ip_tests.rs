// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn rejects_empty() {
    assert!(validate_bind_ip("").is_err());
}

#[test]
fn rejects_wildcard_v4_and_v6() {
    assert!(validate_bind_ip("0.0.0.0").unwrap_err().contains("wildcard"));
    assert!(validate_bind_ip("::").unwrap_err().contains("wildcard"));
}

#[test]
fn rejects_loopback_v4_and_v6() {
    assert!(validate_bind_ip("127.0.0.1").unwrap_err().contains("loopback"));
    assert!(validate_bind_ip("::1").unwrap_err().contains("loopback"));
}

#[test]
fn accepts_routable_address() {
    assert!(validate_bind_ip("192.168.1.5").is_ok());
}

#[test]
fn rejects_port_zero_only() {
    assert!(validate_ports(&[80, 443]).is_ok());
    assert!(validate_ports(&[0]).is_err());
}
