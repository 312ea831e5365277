// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! State of one hardware timer.

use nexus_hal::{IrqHandle, Signaler};

use crate::clock::ElapsedClock;
use crate::dispatch::{dispatch_due, TickReport};
use crate::registry::ConsumerTable;

/// A timer slot is either cleared (stopped, no consumers) or fully running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerSlot {
    pub(crate) active: bool,
    pub(crate) irq: Option<IrqHandle>,
    pub(crate) period_us: u32,
    pub(crate) elapsed: ElapsedClock,
    pub(crate) tick_accumulator: u32,
    pub(crate) ticks_per_period: u32,
    pub(crate) consumers: ConsumerTable,
}

impl TimerSlot {
    pub const fn cleared() -> Self {
        Self {
            active: false,
            irq: None,
            period_us: 0,
            elapsed: ElapsedClock::ZERO,
            tick_accumulator: 0,
            ticks_per_period: 1,
            consumers: ConsumerTable::new(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::cleared();
    }

    /// Starts a fresh session: zero accounting, no consumers.
    pub(crate) fn activate(&mut self, irq: IrqHandle, period_us: u32) {
        *self = Self { active: true, irq: Some(irq), period_us, ..Self::cleared() };
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn irq(&self) -> Option<IrqHandle> {
        self.irq
    }

    pub fn period_us(&self) -> u32 {
        self.period_us
    }

    pub fn elapsed(&self) -> ElapsedClock {
        self.elapsed
    }

    pub fn ticks_per_period(&self) -> u32 {
        self.ticks_per_period
    }

    pub fn consumers(&self) -> &ConsumerTable {
        &self.consumers
    }

    /// Accounts one hardware tick. Returns `None` while ticks are still being
    /// coalesced, otherwise advances the clock and dispatches.
    pub(crate) fn on_tick<S>(&mut self, timer: usize, signaler: &S) -> Option<TickReport>
    where
        S: Signaler + ?Sized,
    {
        self.tick_accumulator += 1;
        if self.tick_accumulator < self.ticks_per_period {
            return None;
        }
        self.tick_accumulator = 0;
        self.elapsed = self.elapsed.advance(self.period_us);
        Some(dispatch_due(timer, self.elapsed, &mut self.consumers, signaler))
    }
}

impl Default for TimerSlot {
    fn default() -> Self {
        Self::cleared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProcessId;
    use nexus_hal::HalError;
    use std::cell::Cell;

    struct Counter(Cell<u32>);

    impl Signaler for Counter {
        fn signal(&self, _signo: i32, _pid: u32, _value: u32) -> Result<(), HalError> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    fn running(period_us: u32) -> TimerSlot {
        let mut slot = TimerSlot::cleared();
        slot.activate(IrqHandle { timer: 0, irq: 7 }, period_us);
        slot
    }

    #[test]
    fn activate_resets_session() {
        let mut slot = running(100);
        let pid = ProcessId::new(5).unwrap();
        slot.consumers.upsert(slot.elapsed, pid, 300, false).unwrap();
        slot.on_tick(0, &Counter(Cell::new(0)));

        slot.activate(IrqHandle { timer: 0, irq: 7 }, 250);
        assert!(slot.is_active());
        assert_eq!(slot.period_us(), 250);
        assert_eq!(slot.elapsed(), ElapsedClock::ZERO);
        assert!(slot.consumers().is_empty());
    }

    #[test]
    fn every_tick_is_a_period_by_default() {
        let mut slot = running(1000);
        let signals = Counter(Cell::new(0));
        for _ in 0..3 {
            assert!(slot.on_tick(0, &signals).is_some());
        }
        assert_eq!(slot.elapsed().as_micros(), 3000);
    }

    #[test]
    fn coalesced_ticks_advance_once_per_period() {
        let mut slot = running(1000);
        slot.ticks_per_period = 4;
        let signals = Counter(Cell::new(0));
        let reports: Vec<_> = (0..8).map(|_| slot.on_tick(0, &signals).is_some()).collect();
        assert_eq!(reports, vec![false, false, false, true, false, false, false, true]);
        assert_eq!(slot.elapsed().as_micros(), 2000);
    }

    #[test]
    fn clear_returns_to_stopped_invariant() {
        let mut slot = running(10);
        slot.clear();
        assert_eq!(slot, TimerSlot::cleared());
        assert!(slot.irq().is_none());
    }
}
