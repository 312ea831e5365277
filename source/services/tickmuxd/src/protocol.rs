// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Control channel grammar (line oriented, whitespace separated, decimal fields)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests below + `tests/control_protocol.rs`
//!
//! ```text
//! + <timer> <period_us>              start timer
//! + <timer> <period_us> <pid> [0|1]  register consumer, 1 = fire once
//! - <timer>                          stop timer
//! - <timer> <pid>                    remove consumer
//! ?                                  dump running timers
//! ```
//!
//! A pid of 0 means "no pid". Lines end at `\n`, `\r` or NUL. Parsing is pure; every
//! field of a line is validated before the command is handed to the multiplexer.

use crate::registry::ProcessId;
use crate::{Error, Result, TOTAL_TIMERS};

/// One validated control command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start { timer: usize, period_us: u32 },
    Add { timer: usize, pid: ProcessId, period_us: u32, fire_once: bool },
    Stop { timer: usize },
    Remove { timer: usize, pid: ProcessId },
    Query,
}

/// Why a control line could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(char),
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("invalid {field} '{token}'")]
    InvalidNumber { field: &'static str, token: String },
    #[error("fire-once flag must be 0 or 1, got '{0}'")]
    InvalidFlag(String),
    #[error("unexpected field '{0}'")]
    TrailingField(String),
}

/// A non-blank line together with its parse result.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub text: &'a str,
    pub command: Result<Command>,
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_eol(c: char) -> bool {
    c == '\n' || c == '\r' || c == '\0'
}

/// Splits a control write into trimmed, non-blank lines.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_eol).map(|line| line.trim_matches(is_blank)).filter(|line| !line.is_empty())
}

/// Parses every non-blank line of a control write. A bad line never affects its neighbours.
pub fn parse_write(text: &str) -> impl Iterator<Item = ParsedLine<'_>> {
    split_lines(text).map(|text| ParsedLine { text, command: parse_line(text) })
}

/// Parses a single non-blank line.
pub fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim_matches(is_blank);
    let mut chars = line.chars();
    let op = chars.next().ok_or(ParseError::MissingField("operation"))?;
    let mut fields = Fields::new(chars.as_str());

    let command = match op {
        '?' => Command::Query,
        '+' => {
            let timer = fields.timer()?;
            let period_us = fields.required("period")?;
            let pid = fields.optional("pid")?.and_then(ProcessId::new);
            let fire_once = fields.flag()?;
            match pid {
                Some(pid) => Command::Add { timer, pid, period_us, fire_once },
                None => Command::Start { timer, period_us },
            }
        }
        '-' => {
            let timer = fields.timer()?;
            match fields.optional("pid")?.and_then(ProcessId::new) {
                Some(pid) => Command::Remove { timer, pid },
                None => Command::Stop { timer },
            }
        }
        other => return Err(ParseError::UnknownOperation(other).into()),
    };
    fields.finish()?;
    Ok(command)
}

struct Fields<'a> {
    tokens: core::str::Split<'a, fn(char) -> bool>,
}

impl<'a> Fields<'a> {
    fn new(rest: &'a str) -> Self {
        Self { tokens: rest.split(is_blank as fn(char) -> bool) }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        self.tokens.by_ref().find(|token| !token.is_empty())
    }

    fn required(&mut self, field: &'static str) -> Result<u32> {
        let token = self.next_token().ok_or(ParseError::MissingField(field))?;
        parse_decimal(field, token)
    }

    fn optional(&mut self, field: &'static str) -> Result<Option<u32>> {
        self.next_token().map(|token| parse_decimal(field, token)).transpose()
    }

    fn timer(&mut self) -> Result<usize> {
        let raw = self.required("timer")?;
        match usize::try_from(raw) {
            Ok(timer) if timer < TOTAL_TIMERS => Ok(timer),
            _ => Err(Error::InvalidTimerIndex(raw)),
        }
    }

    fn flag(&mut self) -> Result<bool> {
        match self.next_token() {
            None | Some("0") => Ok(false),
            Some("1") => Ok(true),
            Some(other) => Err(ParseError::InvalidFlag(other.to_string()).into()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.next_token() {
            Some(extra) => Err(ParseError::TrailingField(extra.to_string()).into()),
            None => Ok(()),
        }
    }
}

fn parse_decimal(field: &'static str, token: &str) -> Result<u32> {
    let invalid = || ParseError::InvalidNumber { field, token: token.to_string() };
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid().into());
    }
    token.parse::<u32>().map_err(|_| invalid().into())
}
