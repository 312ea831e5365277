// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Thread-safe fakes for the hardware collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use nexus_hal::{
    ClockSource, HalError, IrqController, IrqHandle, IrqMask, RegisterMapper, ReloadRegisters,
    Signaler,
};
use parking_lot::Mutex;
use tickmuxd::hw::AR9331_TIMERS;
use tickmuxd::{ProcessId, TimerMux};

pub const TICK_RATE_HZ: u32 = 200_000_000;

pub struct Clock(pub Option<u32>);

impl ClockSource for Clock {
    fn tick_rate_hz(&self) -> Option<u32> {
        self.0
    }
}

#[derive(Clone, Default)]
pub struct Registers(pub Arc<Mutex<Vec<(usize, u32)>>>);

impl ReloadRegisters for Registers {
    fn write_reload(&self, timer: usize, ticks: u32) {
        self.0.lock().push((timer, ticks));
    }
}

pub struct Mapper(pub Option<Registers>);

impl RegisterMapper for Mapper {
    type Registers = Registers;

    fn map(&self) -> Result<Registers, HalError> {
        self.0.clone().ok_or(HalError::MapFailed)
    }
}

/// Interrupt controller; masking is a no-op because ticks arrive on ordinary threads.
#[derive(Clone, Default)]
pub struct Irq {
    pub installed: Arc<Mutex<HashSet<usize>>>,
    pub refuse: Arc<Mutex<HashSet<usize>>>,
}

impl IrqMask for Irq {
    fn save_and_disable(&self) -> usize {
        0
    }

    fn restore(&self, _state: usize) {}
}

impl IrqController for Irq {
    fn install(&self, timer: usize) -> Result<IrqHandle, HalError> {
        let irq = AR9331_TIMERS[timer].irq;
        if self.refuse.lock().contains(&timer) || !self.installed.lock().insert(timer) {
            return Err(HalError::IrqUnavailable { irq });
        }
        Ok(IrqHandle { timer, irq })
    }

    fn uninstall(&self, handle: IrqHandle) {
        self.installed.lock().remove(&handle.timer);
    }
}

#[derive(Clone, Default)]
pub struct Signals {
    pub sent: Arc<Mutex<Vec<(u32, u32)>>>,
    pub signos: Arc<Mutex<Vec<i32>>>,
    pub gone: Arc<Mutex<HashSet<u32>>>,
}

impl Signals {
    pub fn sent(&self) -> Vec<(u32, u32)> {
        self.sent.lock().clone()
    }
}

impl Signaler for Signals {
    fn signal(&self, signo: i32, pid: u32, value: u32) -> Result<(), HalError> {
        self.signos.lock().push(signo);
        if self.gone.lock().contains(&pid) {
            return Err(HalError::ProcessGone { pid });
        }
        self.sent.lock().push((pid, value));
        Ok(())
    }
}

pub type Mux = TimerMux<Registers, Irq, Signals>;

pub struct Harness {
    pub mux: Mux,
    pub regs: Registers,
    pub irq: Irq,
    pub signals: Signals,
}

pub fn harness() -> Harness {
    let regs = Registers::default();
    let irq = Irq::default();
    let signals = Signals::default();
    let mux = TimerMux::init(
        &Clock(Some(TICK_RATE_HZ)),
        &Mapper(Some(regs.clone())),
        irq.clone(),
        signals.clone(),
    )
    .expect("init");
    Harness { mux, regs, irq, signals }
}

pub fn pid(raw: u32) -> ProcessId {
    ProcessId::new(raw).expect("non-zero pid")
}

/// Handle installed on a running timer.
pub fn handle(mux: &Mux, timer: usize) -> IrqHandle {
    mux.snapshot()[timer].irq().expect("timer running")
}

pub fn tick(mux: &Mux, timer: usize, times: usize) {
    let handle = handle(mux, timer);
    for _ in 0..times {
        mux.handle_tick(handle);
    }
}
