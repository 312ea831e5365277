// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Control-path execution of parsed commands.
//!
//! Each line of a write is validated completely before it touches the multiplexer, and
//! a rejected line is reported without affecting the lines around it.

use core::fmt::Write as _;

use log::{info, warn};
use nexus_hal::{IrqController, ReloadRegisters, Signaler};

use crate::mux::TimerMux;
use crate::protocol::{parse_write, Command};
use crate::{Error, Result, MAX_WRITE_LEN};

/// Receives the text produced by a control write (query dumps and rejections).
pub trait OutputSink {
    fn line(&mut self, line: &str);
}

impl OutputSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Outcome of one control write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Lines executed successfully.
    pub applied: usize,
    /// Lines rejected (malformed or refused by the multiplexer).
    pub rejected: usize,
}

impl<R, C, S> TimerMux<R, C, S>
where
    R: ReloadRegisters,
    C: IrqController,
    S: Signaler,
{
    /// Executes every command of a control write in order.
    ///
    /// Only an oversized write fails as a whole; nothing of it is executed.
    pub fn execute_write(&self, buf: &[u8], sink: &mut dyn OutputSink) -> Result<WriteSummary> {
        if buf.len() > MAX_WRITE_LEN {
            warn!("tickmuxd: control write of {} bytes rejected", buf.len());
            return Err(Error::WriteTooLarge { len: buf.len() });
        }
        let text = String::from_utf8_lossy(buf);
        let mut summary = WriteSummary::default();
        for parsed in parse_write(&text) {
            match parsed.command.and_then(|command| self.execute_command(command, sink)) {
                Ok(()) => summary.applied += 1,
                Err(err) => {
                    match err {
                        Error::NotFound { .. } => info!("tickmuxd: '{}': {err}", parsed.text),
                        _ => warn!("tickmuxd: rejected '{}': {err}", parsed.text),
                    }
                    sink.line(&format!("{}: {err}", parsed.text));
                    summary.rejected += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Executes one validated command.
    pub fn execute_command(&self, command: Command, sink: &mut dyn OutputSink) -> Result<()> {
        match command {
            Command::Start { timer, period_us } => self.start(timer, period_us),
            Command::Stop { timer } => self.stop(timer).map(|_| ()),
            Command::Add { timer, pid, period_us, fire_once } => {
                self.add(timer, pid, period_us, fire_once).map(|_| ())
            }
            Command::Remove { timer, pid } => self.remove(timer, pid),
            Command::Query => {
                self.query(sink);
                Ok(())
            }
        }
    }

    /// Writes one line per running timer: `Timer <t> (IRQ <irq>): <pid> (<period> us), ...`.
    pub fn query(&self, sink: &mut dyn OutputSink) {
        let slots = self.snapshot();
        for (timer, slot) in slots.iter().enumerate() {
            let Some(handle) = slot.irq().filter(|_| slot.is_active()) else {
                continue;
            };
            let mut line = format!("Timer {timer} (IRQ {}): ", handle.irq);
            for (i, consumer) in slot.consumers().iter().enumerate() {
                if i > 0 {
                    line.push_str(", ");
                }
                let _ = write!(line, "{} ({} us)", consumer.pid, consumer.period_us);
            }
            sink.line(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProcessId;
    use crate::test_support::rig;

    fn pid(raw: u32) -> ProcessId {
        ProcessId::new(raw).unwrap()
    }

    #[test]
    fn bad_line_is_reported_and_next_line_runs() {
        let r = rig();
        r.mux.start(0, 1000).unwrap();
        let mut out = Vec::new();
        let summary = r.mux.execute_write(b"+ abc 100\n- 0", &mut out).unwrap();

        assert_eq!(summary, WriteSummary { applied: 1, rejected: 1 });
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("+ abc 100: malformed command"));
        assert!(!r.mux.is_running(0));
    }

    #[test]
    fn oversized_write_executes_nothing() {
        let r = rig();
        let mut buf = b"+ 0 1000\n".to_vec();
        buf.resize(MAX_WRITE_LEN + 1, b' ');
        let mut out = Vec::new();
        assert_eq!(
            r.mux.execute_write(&buf, &mut out),
            Err(Error::WriteTooLarge { len: MAX_WRITE_LEN + 1 })
        );
        assert!(!r.mux.is_running(0));
        assert!(out.is_empty());
    }

    #[test]
    fn write_at_the_limit_is_accepted() {
        let r = rig();
        let mut buf = b"+ 2 1000\n".to_vec();
        buf.resize(MAX_WRITE_LEN, b'\n');
        let mut out = Vec::new();
        assert_eq!(
            r.mux.execute_write(&buf, &mut out),
            Ok(WriteSummary { applied: 1, rejected: 0 })
        );
        assert!(r.mux.is_running(2));
    }

    #[test]
    fn empty_write_does_nothing() {
        let r = rig();
        let mut out = Vec::new();
        assert_eq!(r.mux.execute_write(b"", &mut out), Ok(WriteSummary::default()));
        assert_eq!(r.mux.execute_write(b"\n\r\n", &mut out), Ok(WriteSummary::default()));
        assert!(out.is_empty());
    }

    #[test]
    fn full_command_set_drives_the_mux() {
        let r = rig();
        let mut out = Vec::new();
        let summary = r
            .mux
            .execute_write(b"+ 1 1000\n+ 1 3000 12\n+ 1 500 13 1\n- 1 12\0", &mut out)
            .unwrap();
        assert_eq!(summary, WriteSummary { applied: 4, rejected: 0 });
        let consumers = r.mux.list(1).unwrap();
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].pid, pid(13));
        assert!(consumers[0].fire_once);
    }

    #[test]
    fn mux_refusals_are_reported_per_line() {
        let r = rig();
        let mut out = Vec::new();
        let summary = r.mux.execute_write(b"+ 0 100 5\n+ 9 100\n- 0 5", &mut out).unwrap();
        assert_eq!(summary, WriteSummary { applied: 0, rejected: 3 });
        assert_eq!(
            out,
            vec![
                "+ 0 100 5: timer 0 is not running".to_string(),
                "+ 9 100: timer index 9 out of range".to_string(),
                "- 0 5: timer 0 is not running".to_string(),
            ]
        );
    }

    #[test]
    fn remove_of_expired_pid_reports_not_found() {
        let r = rig();
        r.mux.start(0, 100).unwrap();
        let mut out = Vec::new();
        r.mux.execute_write(b"- 0 9", &mut out).unwrap();
        assert_eq!(out, vec!["- 0 9: pid 9 is not registered on timer 0".to_string()]);
    }

    #[test]
    fn query_lists_running_timers_only() {
        let r = rig();
        r.mux.start(0, 1000).unwrap();
        r.mux.start(2, 250).unwrap();
        r.mux.add(0, pid(42), 5000, false).unwrap();
        r.mux.add(0, pid(7), 2000, true).unwrap();

        let mut out = Vec::new();
        let summary = r.mux.execute_write(b"?", &mut out).unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(
            out,
            vec![
                "Timer 0 (IRQ 8): 42 (5000 us), 7 (2000 us)".to_string(),
                "Timer 2 (IRQ 17): ".to_string(),
            ]
        );
    }

    #[test]
    fn query_mid_write_sees_earlier_lines() {
        let r = rig();
        let mut out = Vec::new();
        r.mux.execute_write(b"+ 3 100\n?\n- 3\n?", &mut out).unwrap();
        assert_eq!(out, vec!["Timer 3 (IRQ 18): ".to_string()]);
    }
}
