// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: tickmuxd: multiplexes a few hardware periodic timers across many consumers
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests per module + `tests/` (lifecycle, dispatch scenarios,
//!   control protocol, concurrency, host service loop)
//!
//! PUBLIC API:
//!   - `TimerMux`: owns the timer slots; `init`/`teardown`, `start`/`stop`,
//!     `add`/`remove`/`list`, `handle_tick` (interrupt context), `execute_write`
//!   - `protocol`: control-line tokenizer and command parser
//!   - `client`: command builders and notification payload decoding
//!   - `std_server`: host control-channel service loop
//!
//! INVARIANTS:
//!   - Consumers of a timer form a hole-free prefix of at most `MAX_CONSUMERS` entries
//!   - At most one registration per (timer, pid)
//!   - A slot is either fully running or fully cleared outside the slot lock
//!   - The interrupt path never allocates, logs or blocks

#![forbid(unsafe_code)]

pub mod client;
pub mod clock;
mod control;
pub mod dispatch;
pub mod hw;
mod mux;
pub mod protocol;
pub mod registry;
mod slot;
pub mod std_server;

pub use clock::ElapsedClock;
pub use control::{OutputSink, WriteSummary};
pub use dispatch::{notification_payload, TickReport};
pub use mux::TimerMux;
pub use protocol::{Command, ParseError};
pub use registry::{AddOutcome, Consumer, ProcessId};
pub use slot::TimerSlot;

use nexus_hal::HalError;

/// Number of hardware timers in the block.
pub const TOTAL_TIMERS: usize = 4;
/// Consumers per timer.
pub const MAX_CONSUMERS: usize = 10;
/// Largest control write accepted in one piece.
pub const MAX_WRITE_LEN: usize = 512;
/// Timer input rate assumed when the clock cannot be discovered.
pub const DEFAULT_TICK_RATE_HZ: u32 = 200_000_000;
/// The warm-up reload is `tick_rate_hz / WARMUP_DIVISOR` (10 ms of lead time).
pub const WARMUP_DIVISOR: u32 = 100;
/// Real-time signal number every notification is queued with.
pub const SIG_TIMER_IRQ: i32 = 43;
/// Name of the control channel.
pub const CONTROL_FILE_NAME: &str = "timer-irq";

/// Result alias for multiplexer operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced by the multiplexer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Every consumer entry of the timer is taken.
    #[error("timer {timer} already serves {} consumers", MAX_CONSUMERS)]
    CapacityExceeded { timer: usize },
    /// Remove of a pid that is not registered (it may have expired already).
    #[error("pid {pid} is not registered on timer {timer}")]
    NotFound { timer: usize, pid: u32 },
    /// Timer index outside `0..TOTAL_TIMERS`.
    #[error("timer index {0} out of range")]
    InvalidTimerIndex(u32),
    /// The control line could not be parsed.
    #[error("malformed command: {0}")]
    MalformedCommand(#[from] ParseError),
    /// The tick interrupt could not be installed; the timer stays stopped.
    #[error("timer {timer}: tick handler install failed: {cause}")]
    HandlerInstallFailed { timer: usize, cause: HalError },
    /// Consumers can only be managed on a running timer.
    #[error("timer {timer} is not running")]
    TimerNotRunning { timer: usize },
    /// Periods must be non-zero.
    #[error("period must be greater than zero")]
    InvalidPeriod,
    /// The hardware period does not fit the reload register at the current tick rate.
    #[error("period {period_us} us exceeds the {max_us} us reload range")]
    PeriodTooLong { period_us: u32, max_us: u32 },
    /// Control write exceeds `MAX_WRITE_LEN`.
    #[error("control write of {len} bytes exceeds {} bytes", MAX_WRITE_LEN)]
    WriteTooLarge { len: usize },
    /// The register window could not be mapped at init.
    #[error("hardware mapping failed: {0}")]
    HardwareMap(HalError),
}

pub(crate) fn check_timer(timer: usize) -> Result<()> {
    if timer < TOTAL_TIMERS {
        Ok(())
    } else {
        Err(Error::InvalidTimerIndex(u32::try_from(timer).unwrap_or(u32::MAX)))
    }
}
