// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fixed-capacity, insertion-ordered consumer table of one timer slot.
//!
//! Occupied entries always form a prefix; the first empty entry ends the table. Removal
//! shifts the tail left by one so the prefix stays hole-free and order is preserved.

use core::fmt;
use core::num::NonZeroU32;

use crate::clock::ElapsedClock;
use crate::MAX_CONSUMERS;

/// External process identifier. Zero is reserved and cannot be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(NonZeroU32);

impl ProcessId {
    /// Returns `None` for the reserved value `0`.
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(pid) => Some(Self(pid)),
            None => None,
        }
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumer {
    pub pid: ProcessId,
    pub period_us: u32,
    pub fire_once: bool,
    /// Elapsed-clock value at or after which the next notification is owed.
    pub due: ElapsedClock,
}

/// Whether an add created a registration or refreshed an existing one.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    Updated,
}

/// All entries are occupied and the pid is not among them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableFull;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumerTable {
    entries: [Option<Consumer>; MAX_CONSUMERS],
}

impl ConsumerTable {
    pub const fn new() -> Self {
        Self { entries: [None; MAX_CONSUMERS] }
    }

    pub fn len(&self) -> usize {
        self.entries.iter().position(Option::is_none).unwrap_or(MAX_CONSUMERS)
    }

    pub fn is_empty(&self) -> bool {
        self.entries[0].is_none()
    }

    pub fn is_full(&self) -> bool {
        self.entries[MAX_CONSUMERS - 1].is_some()
    }

    pub fn get(&self, index: usize) -> Option<&Consumer> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Consumer> {
        self.entries.get_mut(index).and_then(Option::as_mut)
    }

    pub fn position(&self, pid: ProcessId) -> Option<usize> {
        self.iter().position(|consumer| consumer.pid == pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Consumer> + '_ {
        self.entries.iter().map_while(Option::as_ref)
    }

    /// Registers `pid`, or refreshes its registration when already present.
    ///
    /// The due time is always recomputed as `now + period_us`.
    pub fn upsert(
        &mut self,
        now: ElapsedClock,
        pid: ProcessId,
        period_us: u32,
        fire_once: bool,
    ) -> Result<AddOutcome, TableFull> {
        let consumer = Consumer { pid, period_us, fire_once, due: now.advance(period_us) };
        if let Some(index) = self.position(pid) {
            self.entries[index] = Some(consumer);
            return Ok(AddOutcome::Updated);
        }
        let index = self.len();
        if index == MAX_CONSUMERS {
            return Err(TableFull);
        }
        self.entries[index] = Some(consumer);
        Ok(AddOutcome::Inserted)
    }

    pub fn remove(&mut self, pid: ProcessId) -> Option<Consumer> {
        let index = self.position(pid)?;
        self.compact_remove_at(index)
    }

    /// Removes entry `index` and shifts the rest of the prefix left by one.
    ///
    /// After a successful call the entry that followed `index` (if any) sits at `index`.
    pub fn compact_remove_at(&mut self, index: usize) -> Option<Consumer> {
        let removed = self.get(index).copied()?;
        let len = self.len();
        self.entries.copy_within(index + 1..len, index);
        self.entries[len - 1] = None;
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.entries = [None; MAX_CONSUMERS];
    }
}

impl Default for ConsumerTable {
    fn default() -> Self {
        Self::new()
    }
}
