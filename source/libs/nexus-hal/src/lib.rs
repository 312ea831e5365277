// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Hardware collaborator contracts for periodic timer blocks
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests in this crate + `tests/contracts.rs`
//!
//! The timer multiplexer only talks to hardware through these traits; board glue
//! provides the implementations and host tests provide fakes.

#![cfg_attr(not(test), no_std)]

use core::fmt;

pub use nexus_sync::IrqMask;

/// Basic bus access trait shared by user drivers.
pub trait Bus {
    fn read(&self, addr: usize) -> u32;
    fn write(&self, addr: usize, value: u32);
}

/// Clock-frequency discovery for the bus feeding the timer block.
pub trait ClockSource {
    /// Returns the timer input rate, or `None` when it cannot be discovered.
    fn tick_rate_hz(&self) -> Option<u32>;
}

/// Mapped register window of a timer block.
pub trait ReloadRegisters {
    /// Programs the reload value (in input clock ticks) of timer `timer`.
    fn write_reload(&self, timer: usize, ticks: u32);
}

/// Maps the timer register region into the caller's address space.
pub trait RegisterMapper {
    type Registers: ReloadRegisters;

    fn map(&self) -> Result<Self::Registers, HalError>;
}

/// Handle of an installed tick interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IrqHandle {
    pub timer: usize,
    pub irq: u32,
}

/// Interrupt controller for the timer lines.
///
/// The [`IrqMask`] supertrait masks local interrupts around critical sections shared
/// with the tick handler.
pub trait IrqController: IrqMask {
    /// Routes the tick interrupt of `timer` to the multiplexer.
    fn install(&self, timer: usize) -> Result<IrqHandle, HalError>;

    /// Releases the line. Must not return while a tick for `handle` is still executing.
    fn uninstall(&self, handle: IrqHandle);
}

/// Asynchronous notification of an external process.
///
/// Implementations must not block: the call happens with interrupts masked.
pub trait Signaler {
    /// Queues real-time signal `signo` carrying `value` to process `pid`.
    fn signal(&self, signo: i32, pid: u32, value: u32) -> Result<(), HalError>;
}

/// Failures reported by hardware collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalError {
    /// The register region could not be mapped.
    MapFailed,
    /// The interrupt line is busy or does not exist.
    IrqUnavailable { irq: u32 },
    /// The target process no longer exists.
    ProcessGone { pid: u32 },
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MapFailed => write!(f, "register window mapping failed"),
            Self::IrqUnavailable { irq } => write!(f, "irq {irq} unavailable"),
            Self::ProcessGone { pid } => write!(f, "process {pid} is gone"),
        }
    }
}
