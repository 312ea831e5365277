// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Consumer-side helpers for the control channel
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests below + `tests/control_protocol.rs`
//!
//! Builds control lines, decodes notification payloads and measures the interval of
//! received notifications. Writes may carry a trailing NUL; the daemon treats it as a
//! line terminator.

use core::fmt;
use core::time::Duration;

use crate::dispatch::{PAYLOAD_PERIOD_MASK, PAYLOAD_TIMER_SHIFT};

/// Hardware tick used by the measuring client when it starts a timer itself.
pub const DEFAULT_CLIENT_TICK_US: u32 = 20;

/// Dumps every running timer.
pub const QUERY_COMMAND: &str = "?";

pub fn start_command(timer: usize, period_us: u32) -> String {
    format!("+ {timer} {period_us}")
}

pub fn add_command(timer: usize, pid: u32, period_us: u32, fire_once: bool) -> String {
    if fire_once {
        format!("+ {timer} {period_us} {pid} 1")
    } else {
        format!("+ {timer} {period_us} {pid}")
    }
}

pub fn stop_command(timer: usize) -> String {
    format!("- {timer}")
}

pub fn remove_command(timer: usize, pid: u32) -> String {
    format!("- {timer} {pid}")
}

/// Starts `timer` at `tick_us` and registers `pid` for `period_us` in one write.
pub fn subscribe_command(timer: usize, tick_us: u32, pid: u32, period_us: u32) -> String {
    format!("{}\n{}", start_command(timer, tick_us), add_command(timer, pid, period_us, false))
}

/// Splits a notification payload into `(timer, period_us & 0xFF_FFFF)`.
pub const fn decode_payload(payload: u32) -> (usize, u32) {
    ((payload >> PAYLOAD_TIMER_SHIFT) as usize, payload & PAYLOAD_PERIOD_MASK)
}

/// Counts received notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntervalMeter {
    signals: u32,
}

impl IntervalMeter {
    pub const fn new() -> Self {
        Self { signals: 0 }
    }

    /// Records one received notification.
    pub fn record(&mut self) {
        self.signals = self.signals.saturating_add(1);
    }

    pub fn signals(&self) -> u32 {
        self.signals
    }

    /// Summarizes the notifications received over `elapsed`.
    pub fn report(&self, elapsed: Duration) -> IntervalReport {
        let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        IntervalReport { signals: self.signals, elapsed_us }
    }
}

/// Result of a measuring run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalReport {
    pub signals: u32,
    pub elapsed_us: u64,
}

impl IntervalReport {
    /// Average interval between notifications; `None` when nothing arrived.
    pub fn interval_us(&self) -> Option<u64> {
        self.elapsed_us.checked_div(u64::from(self.signals))
    }
}

impl fmt::Display for IntervalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let us = self.elapsed_us;
        write!(
            f,
            "Received {} signals in {us} us ({} s {} ms {} us).",
            self.signals,
            us / 1_000_000,
            (us % 1_000_000) / 1_000,
            us % 1_000
        )?;
        match self.interval_us() {
            Some(interval) => write!(f, " Interval is about {interval} us."),
            None => write!(f, " No interval measured."),
        }
    }
}
