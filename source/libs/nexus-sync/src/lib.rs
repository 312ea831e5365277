// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Spin lock that masks local interrupts while held
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests in this crate
//!
//! INVARIANTS:
//! - Interrupts are masked before the flag is taken and restored after it is released
//! - Acquisition never sleeps; it only spins while another context holds the flag

#![cfg_attr(not(test), no_std)]

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// Local interrupt masking primitive used by [`IrqSpinLock`].
///
/// `save_and_disable` returns an opaque token describing the previous state which is
/// handed back to `restore` in LIFO order.
pub trait IrqMask {
    /// Masks local interrupts and returns the previous mask state.
    fn save_and_disable(&self) -> usize;
    /// Restores the mask state returned by the matching `save_and_disable`.
    fn restore(&self, state: usize);
}

/// Mask for hosts where ticks are delivered on ordinary threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIrqMask;

impl IrqMask for NoIrqMask {
    fn save_and_disable(&self) -> usize {
        0
    }

    fn restore(&self, _state: usize) {}
}

/// Spin lock shared between interrupt handlers and the code they interrupt.
pub struct IrqSpinLock<T: ?Sized> {
    flag: AtomicBool,
    value: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for IrqSpinLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for IrqSpinLock<T> {}

impl<T> IrqSpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            flag: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: ?Sized> IrqSpinLock<T> {
    /// Masks interrupts through `mask`, then spins until the lock is taken.
    pub fn lock_irqsave<'a>(&'a self, mask: &'a dyn IrqMask) -> IrqSpinLockGuard<'a, T> {
        let saved = mask.save_and_disable();
        while self
            .flag
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.flag.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
        IrqSpinLockGuard { lock: self, mask, saved }
    }

    /// Single acquisition attempt; interrupts are left untouched on failure.
    pub fn try_lock_irqsave<'a>(
        &'a self,
        mask: &'a dyn IrqMask,
    ) -> Option<IrqSpinLockGuard<'a, T>> {
        let saved = mask.save_and_disable();
        if self
            .flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(IrqSpinLockGuard { lock: self, mask, saved })
        } else {
            mask.restore(saved);
            None
        }
    }

    pub fn is_locked(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Exclusive access without locking; the borrow checker proves there is no other user.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    fn unlock(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Guard returned by [`IrqSpinLock::lock_irqsave`]; releases the flag, then restores interrupts.
pub struct IrqSpinLockGuard<'a, T: ?Sized> {
    lock: &'a IrqSpinLock<T>,
    mask: &'a dyn IrqMask,
    saved: usize,
}

impl<'a, T: ?Sized> Deref for IrqSpinLockGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.value.get() }
    }
}

impl<'a, T: ?Sized> DerefMut for IrqSpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<'a, T: ?Sized> Drop for IrqSpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.unlock();
        self.mask.restore(self.saved);
    }
}
