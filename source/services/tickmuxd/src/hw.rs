// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! AR9331 (ath79) general purpose timer layout.

use nexus_hal::{Bus, ReloadRegisters};

use crate::TOTAL_TIMERS;

/// First interrupt number of the misc interrupt controller (after the 8 CPU lines).
pub const MISC_IRQ_BASE: u32 = 8;

pub const fn misc_irq(line: u32) -> u32 {
    MISC_IRQ_BASE + line
}

/// Interrupt line and reload register of one timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerDescriptor {
    pub irq: u32,
    /// Offset of the reload register inside the mapped block.
    pub reload_reg: usize,
}

pub const AR9331_TIMERS: [TimerDescriptor; TOTAL_TIMERS] = [
    TimerDescriptor { irq: misc_irq(0), reload_reg: 0x04 },
    TimerDescriptor { irq: misc_irq(8), reload_reg: 0x98 },
    TimerDescriptor { irq: misc_irq(9), reload_reg: 0xA0 },
    TimerDescriptor { irq: misc_irq(10), reload_reg: 0xA8 },
];

/// Reload registers reached through a mapped bus window.
pub struct BusReloadRegisters<B> {
    bus: B,
}

impl<B: Bus> BusReloadRegisters<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B: Bus> ReloadRegisters for BusReloadRegisters<B> {
    fn write_reload(&self, timer: usize, ticks: u32) {
        if let Some(desc) = AR9331_TIMERS.get(timer) {
            self.bus.write(desc.reload_reg, ticks);
        }
    }
}
