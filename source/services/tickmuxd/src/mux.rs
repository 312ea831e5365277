// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Timer slot table, lifecycle (start/stop) and consumer management.
//!
//! Two execution contexts meet here. `handle_tick` runs in interrupt context; every
//! other method runs in control context. Slot state is only touched with the
//! interrupt-masking spin lock held. Control operations are additionally serialized by
//! a sleeping mutex because start/stop call into the interrupt controller outside the
//! spin lock.

use log::{info, warn};
use nexus_hal::{ClockSource, IrqController, IrqHandle, RegisterMapper, ReloadRegisters, Signaler};
use nexus_sync::{IrqSpinLock, IrqSpinLockGuard};
use parking_lot::Mutex;

use crate::dispatch::TickReport;
use crate::registry::{AddOutcome, Consumer, ProcessId, TableFull};
use crate::slot::TimerSlot;
use crate::{
    check_timer, Error, Result, DEFAULT_TICK_RATE_HZ, TOTAL_TIMERS, WARMUP_DIVISOR,
};

type Slots = [TimerSlot; TOTAL_TIMERS];

/// Owner of all timer slots and of the hardware collaborators driving them.
pub struct TimerMux<R, C, S> {
    tick_rate_hz: u32,
    registers: R,
    irq: C,
    signaler: S,
    slots: IrqSpinLock<Slots>,
    control: Mutex<()>,
}

impl<R, C, S> TimerMux<R, C, S>
where
    R: ReloadRegisters,
    C: IrqController,
    S: Signaler,
{
    /// Discovers the tick rate, maps the register window and returns a multiplexer with
    /// every timer stopped. Mapping failure is the only fatal condition.
    pub fn init<K, M>(clock: &K, mapper: &M, irq: C, signaler: S) -> Result<Self>
    where
        K: ClockSource + ?Sized,
        M: RegisterMapper<Registers = R> + ?Sized,
    {
        let tick_rate_hz = match clock.tick_rate_hz() {
            Some(hz) if hz >= 1_000_000 => hz,
            other => {
                warn!(
                    "tickmuxd: tick rate {other:?} unusable, falling back to {DEFAULT_TICK_RATE_HZ} Hz"
                );
                DEFAULT_TICK_RATE_HZ
            }
        };
        let registers = mapper.map().map_err(Error::HardwareMap)?;
        info!("tickmuxd: timer block mapped, tick rate {tick_rate_hz} Hz");
        Ok(Self {
            tick_rate_hz,
            registers,
            irq,
            signaler,
            slots: IrqSpinLock::new(core::array::from_fn(|_| TimerSlot::cleared())),
            control: Mutex::new(()),
        })
    }

    /// Stops every timer.
    pub fn teardown(&self) {
        let _control = self.control.lock();
        for timer in 0..TOTAL_TIMERS {
            self.stop_serialized(timer);
        }
        info!("tickmuxd: all timers cleared");
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// Reload value for a hardware period of `period_us`; `None` when it does not fit
    /// the 32-bit reload register.
    pub fn reload_ticks(&self, period_us: u32) -> Option<u32> {
        (self.tick_rate_hz / 1_000_000).checked_mul(period_us)
    }

    /// Longest hardware period the reload register can hold at this tick rate.
    pub fn max_period_us(&self) -> u32 {
        u32::MAX / (self.tick_rate_hz / 1_000_000)
    }

    /// (Re)starts `timer` with a hardware period of `period_us`.
    ///
    /// A running timer is stopped first, which drops all of its consumers.
    pub fn start(&self, timer: usize, period_us: u32) -> Result<()> {
        check_timer(timer)?;
        if period_us == 0 {
            return Err(Error::InvalidPeriod);
        }
        let reload = self.reload_ticks(period_us).ok_or(Error::PeriodTooLong {
            period_us,
            max_us: self.max_period_us(),
        })?;
        let _control = self.control.lock();
        self.stop_serialized(timer);

        // The first reload after reprogramming needs lead time before the first interrupt.
        self.registers.write_reload(timer, self.tick_rate_hz / WARMUP_DIVISOR);
        let handle = self.irq.install(timer).map_err(|cause| {
            warn!("tickmuxd: timer {timer}: tick handler install failed: {cause}");
            Error::HandlerInstallFailed { timer, cause }
        })?;

        {
            let mut slots = self.lock_slots();
            self.registers.write_reload(timer, reload);
            slots[timer].activate(handle, period_us);
        }
        info!("tickmuxd: timer {timer} started with {period_us} us interval (irq {})", handle.irq);
        Ok(())
    }

    /// Stops `timer`. Returns `false` when it was not running.
    pub fn stop(&self, timer: usize) -> Result<bool> {
        check_timer(timer)?;
        let _control = self.control.lock();
        Ok(self.stop_serialized(timer))
    }

    /// Requires the control mutex to be held.
    fn stop_serialized(&self, timer: usize) -> bool {
        let handle = {
            let mut slots = self.lock_slots();
            let handle = slots[timer].irq;
            slots[timer].clear();
            handle
        };
        match handle {
            Some(handle) => {
                // A tick racing with this finds the slot cleared and does nothing.
                self.irq.uninstall(handle);
                info!("tickmuxd: timer {timer} stopped");
                true
            }
            None => false,
        }
    }

    /// Registers `pid` on a running timer, or refreshes its existing registration.
    pub fn add(
        &self,
        timer: usize,
        pid: ProcessId,
        period_us: u32,
        fire_once: bool,
    ) -> Result<AddOutcome> {
        check_timer(timer)?;
        if period_us == 0 {
            return Err(Error::InvalidPeriod);
        }
        let _control = self.control.lock();
        let outcome = {
            let mut slots = self.lock_slots();
            let slot = &mut slots[timer];
            if !slot.active {
                return Err(Error::TimerNotRunning { timer });
            }
            let now = slot.elapsed;
            slot.consumers
                .upsert(now, pid, period_us, fire_once)
                .map_err(|TableFull| Error::CapacityExceeded { timer })?
        };
        info!(
            "tickmuxd: timer {timer}: {outcome:?} pid {pid} every {period_us} us{}",
            if fire_once { " (once)" } else { "" }
        );
        Ok(outcome)
    }

    /// Removes `pid` from `timer`; [`Error::NotFound`] when it is not registered.
    pub fn remove(&self, timer: usize, pid: ProcessId) -> Result<()> {
        check_timer(timer)?;
        let _control = self.control.lock();
        let removed = {
            let mut slots = self.lock_slots();
            let slot = &mut slots[timer];
            if !slot.active {
                return Err(Error::TimerNotRunning { timer });
            }
            slot.consumers.remove(pid)
        };
        match removed {
            Some(_) => {
                info!("tickmuxd: timer {timer}: removed pid {pid}");
                Ok(())
            }
            None => Err(Error::NotFound { timer, pid: pid.get() }),
        }
    }

    /// Consumers of `timer` in registration order. Empty for a stopped timer.
    pub fn list(&self, timer: usize) -> Result<Vec<Consumer>> {
        check_timer(timer)?;
        let table = self.lock_slots()[timer].consumers.clone();
        Ok(table.iter().copied().collect())
    }

    pub fn is_running(&self, timer: usize) -> bool {
        timer < TOTAL_TIMERS && self.lock_slots()[timer].active
    }

    /// Copy of every slot taken under the lock.
    pub fn snapshot(&self) -> Slots {
        self.lock_slots().clone()
    }

    /// Coalesces `ticks` hardware ticks into one logical period on a running timer.
    ///
    /// Reset to 1 by every start; not reachable from the control protocol.
    pub fn set_ticks_per_period(&self, timer: usize, ticks: u32) -> Result<()> {
        check_timer(timer)?;
        if ticks == 0 {
            return Err(Error::InvalidPeriod);
        }
        let _control = self.control.lock();
        let mut slots = self.lock_slots();
        let slot = &mut slots[timer];
        if !slot.active {
            return Err(Error::TimerNotRunning { timer });
        }
        slot.ticks_per_period = ticks;
        slot.tick_accumulator = 0;
        Ok(())
    }

    /// Tick entry point, called by the interrupt glue for an installed handle.
    ///
    /// Ticks for a handle that is no longer installed on its slot are ignored.
    pub fn handle_tick(&self, handle: IrqHandle) -> Option<TickReport> {
        let mut slots = self.lock_slots();
        let slot = slots.get_mut(handle.timer)?;
        if slot.irq != Some(handle) {
            return None;
        }
        slot.on_tick(handle.timer, &self.signaler)
    }

    pub fn registers(&self) -> &R {
        &self.registers
    }

    pub fn irq_controller(&self) -> &C {
        &self.irq
    }

    pub fn signaler(&self) -> &S {
        &self.signaler
    }

    fn lock_slots(&self) -> IrqSpinLockGuard<'_, Slots> {
        self.slots.lock_irqsave(&self.irq)
    }
}
