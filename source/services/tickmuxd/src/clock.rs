// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Overflow-safe elapsed-time accounting built from two 32-bit words.

use core::fmt;

/// Elapsed microseconds as `(wrap, low)`.
///
/// `wrap` counts how many times `low` wrapped past `u32::MAX`. Field order matters:
/// the derived ordering compares `wrap` first, which makes the pair behave like a single
/// 64-bit counter across overflow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElapsedClock {
    wrap: u32,
    low: u32,
}

impl ElapsedClock {
    pub const ZERO: Self = Self { wrap: 0, low: 0 };

    pub const fn new(wrap: u32, low: u32) -> Self {
        Self { wrap, low }
    }

    pub const fn wrap(self) -> u32 {
        self.wrap
    }

    pub const fn low(self) -> u32 {
        self.low
    }

    /// Adds `period_us`, carrying into `wrap` when `low` overflows.
    #[inline]
    pub const fn advance(self, period_us: u32) -> Self {
        let (low, carried) = self.low.overflowing_add(period_us);
        Self { wrap: self.wrap.wrapping_add(carried as u32), low }
    }

    /// The logical 64-bit value.
    pub const fn as_micros(self) -> u64 {
        ((self.wrap as u64) << 32) | self.low as u64
    }

    /// Due test: `self` has reached or passed `due`.
    #[inline]
    pub fn has_reached(self, due: Self) -> bool {
        due <= self
    }
}

impl fmt::Display for ElapsedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.as_micros())
    }
}
