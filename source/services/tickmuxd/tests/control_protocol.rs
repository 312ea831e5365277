// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Control-channel writes executed against a live multiplexer
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 5 integration tests
//!
//! TEST_SCOPE:
//!   - Per-line rejection without poisoning later lines
//!   - Client-built writes (NUL terminated) end to end
//!   - Query dump format
//!   - Size limit
//!
//! TEST_SCENARIOS:
//!   - malformed_line_then_valid_line(): "+ abc 100\n- 0"
//!   - client_subscription_delivers_notifications(): subscribe, tick, decode payload
//!   - query_dump_lists_consumers_in_order(): "Timer t (IRQ n): pid (p us), ..."
//!   - capacity_rejection_is_reported(): 11th consumer line is refused
//!   - oversized_write_is_refused_whole(): nothing executes past MAX_WRITE_LEN
//!
//! DEPENDENCIES:
//!   - tickmuxd::{TimerMux::execute_write, client}: control path under test
//!   - common: thread-safe HAL fakes

mod common;

use common::{harness, tick};
use tickmuxd::client::{
    add_command, decode_payload, stop_command, subscribe_command, IntervalMeter, QUERY_COMMAND,
};
use tickmuxd::{Error, WriteSummary, MAX_CONSUMERS, MAX_WRITE_LEN};

fn nul_terminated(command: &str) -> Vec<u8> {
    let mut bytes = command.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

#[test]
fn malformed_line_then_valid_line() {
    let h = harness();
    h.mux.start(0, 1000).unwrap();
    let mut out: Vec<String> = Vec::new();

    let summary = h.mux.execute_write(b"+ abc 100\n- 0", &mut out).unwrap();

    assert_eq!(summary, WriteSummary { applied: 1, rejected: 1 });
    assert_eq!(out, vec!["+ abc 100: malformed command: invalid timer 'abc'".to_string()]);
    assert!(!h.mux.is_running(0));
    assert!(h.irq.installed.lock().is_empty());
}

#[test]
fn client_subscription_delivers_notifications() {
    let h = harness();
    let mut out: Vec<String> = Vec::new();
    let write = nul_terminated(&subscribe_command(2, 20, 314, 100));

    h.mux.execute_write(&write, &mut out).unwrap();
    assert!(out.is_empty());

    let mut meter = IntervalMeter::new();
    tick(&h.mux, 2, 50);
    for (pid, payload) in h.signals.sent() {
        assert_eq!(pid, 314);
        assert_eq!(decode_payload(payload), (2, 100));
        meter.record();
    }
    assert_eq!(meter.signals(), 10);
    let report = meter.report(core::time::Duration::from_micros(50 * 20));
    assert_eq!(report.interval_us(), Some(100));

    h.mux.execute_write(&nul_terminated(&stop_command(2)), &mut out).unwrap();
    assert!(!h.mux.is_running(2));
}

#[test]
fn query_dump_lists_consumers_in_order() {
    let h = harness();
    let mut out: Vec<String> = Vec::new();
    h.mux
        .execute_write(b"+ 1 500\r+ 1 1500 30\r+ 1 700 31 1\r+ 1 900 30\r?", &mut out)
        .unwrap();
    h.mux.execute_write(QUERY_COMMAND.as_bytes(), &mut out).unwrap();

    let expected = "Timer 1 (IRQ 16): 30 (900 us), 31 (700 us)".to_string();
    assert_eq!(out, vec![expected.clone(), expected]);
}

#[test]
fn capacity_rejection_is_reported() {
    let h = harness();
    let mut out: Vec<String> = Vec::new();
    let mut write = String::from("+ 0 100");
    for raw in 1..=(MAX_CONSUMERS as u32 + 1) {
        write.push('\n');
        write.push_str(&add_command(0, raw, 100, false));
    }

    let summary = h.mux.execute_write(write.as_bytes(), &mut out).unwrap();

    assert_eq!(summary, WriteSummary { applied: MAX_CONSUMERS + 1, rejected: 1 });
    assert_eq!(out, vec![format!("+ 0 100 11: timer 0 already serves {MAX_CONSUMERS} consumers")]);
    assert_eq!(h.mux.list(0).unwrap().len(), MAX_CONSUMERS);
}

#[test]
fn oversized_write_is_refused_whole() {
    let h = harness();
    let mut out: Vec<String> = Vec::new();
    let mut write = String::new();
    while write.len() <= MAX_WRITE_LEN {
        write.push_str("+ 3 1000\n");
    }

    assert_eq!(
        h.mux.execute_write(write.as_bytes(), &mut out),
        Err(Error::WriteTooLarge { len: write.len() })
    );
    assert!(!h.mux.is_running(3));
    assert!(h.regs.0.lock().is_empty());
}
