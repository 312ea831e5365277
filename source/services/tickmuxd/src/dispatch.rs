// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-tick scan that notifies due consumers.
//!
//! Runs in interrupt context with the slot table locked: no allocation, no logging,
//! no blocking calls besides the non-blocking signaler.

use nexus_hal::Signaler;

use crate::clock::ElapsedClock;
use crate::registry::ConsumerTable;
use crate::SIG_TIMER_IRQ;

/// Bits of the payload that carry the consumer period.
pub const PAYLOAD_PERIOD_MASK: u32 = 0x00FF_FFFF;
/// Shift of the timer index inside the payload.
pub const PAYLOAD_TIMER_SHIFT: u32 = 24;

/// Signal value delivered to a consumer: `(timer << 24) | (period_us & 0xFFFFFF)`.
pub const fn notification_payload(timer: usize, period_us: u32) -> u32 {
    ((timer as u32) << PAYLOAD_TIMER_SHIFT) | (period_us & PAYLOAD_PERIOD_MASK)
}

/// Work done by one dispatch pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub timer: usize,
    /// Notifications accepted by the signaler.
    pub delivered: u32,
    /// Consumers removed because they were fire-once or could not be reached.
    pub evicted: u32,
}

/// Notifies every consumer whose due time `now` has reached.
///
/// Periodic consumers get their due time advanced by one period; fire-once consumers
/// and consumers whose delivery failed are compacted out of the table.
pub fn dispatch_due<S>(
    timer: usize,
    now: ElapsedClock,
    consumers: &mut ConsumerTable,
    signaler: &S,
) -> TickReport
where
    S: Signaler + ?Sized,
{
    let mut report = TickReport { timer, ..TickReport::default() };
    let mut index = 0;
    while let Some(consumer) = consumers.get_mut(index) {
        if !now.has_reached(consumer.due) {
            index += 1;
            continue;
        }
        let payload = notification_payload(timer, consumer.period_us);
        let delivered = signaler.signal(SIG_TIMER_IRQ, consumer.pid.get(), payload).is_ok();
        if delivered {
            report.delivered += 1;
        }
        if delivered && !consumer.fire_once {
            consumer.due = consumer.due.advance(consumer.period_us);
            index += 1;
        } else {
            // The next entry slides into `index`; examine it without advancing.
            consumers.compact_remove_at(index);
            report.evicted += 1;
        }
    }
    report
}
