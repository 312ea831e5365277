// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Host service loop for the `timer-irq` control channel.
//!
//! Every received frame is one control write. The lines it produces (query dumps and
//! rejections) are sent back as a single newline-terminated frame; a write that produces
//! no output gets no reply. A writer that went away before its reply is dropped silently
//! and serving continues.

use std::collections::VecDeque;

use log::{debug, error, info};
use nexus_hal::{IrqController, ReloadRegisters, Signaler};
use thiserror::Error;

use crate::{TimerMux, CONTROL_FILE_NAME};

/// Result alias used by the service loop.
pub type ServerResult<T> = core::result::Result<T, ServerError>;

/// Errors surfaced while serving the control channel.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Transport level failure.
    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl From<TransportError> for ServerError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

/// Transport level failures surfaced by [`Transport`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The writer closed its end before the reply was sent.
    #[error("transport closed")]
    Closed,
    /// I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Carries control writes in and output frames out.
pub trait Transport {
    /// Error surfaced by the transport implementation.
    type Error: Into<TransportError>;

    /// Receives the next control write; `None` once the channel is closed.
    fn recv(&mut self) -> core::result::Result<Option<Vec<u8>>, Self::Error>;

    /// Sends an output frame back to the writer.
    fn send(&mut self, frame: &[u8]) -> core::result::Result<(), Self::Error>;
}

/// In-memory transport fed with a fixed list of writes.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    incoming: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    hung_up: usize,
}

impl MemoryTransport {
    pub fn new<I, B>(writes: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            incoming: writes.into_iter().map(Into::into).collect(),
            sent: Vec::new(),
            hung_up: 0,
        }
    }

    /// The writers of the next `count` replies close before reading them.
    pub fn hang_up_next(&mut self, count: usize) {
        self.hung_up = count;
    }

    /// Frames sent so far, in order.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }
}

impl Transport for MemoryTransport {
    type Error = TransportError;

    fn recv(&mut self) -> core::result::Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.incoming.pop_front())
    }

    fn send(&mut self, frame: &[u8]) -> core::result::Result<(), Self::Error> {
        if self.hung_up > 0 {
            self.hung_up -= 1;
            return Err(TransportError::Closed);
        }
        self.sent.push(frame.to_vec());
        Ok(())
    }
}

/// Notifies init when the service is ready.
pub struct ReadyNotifier(Box<dyn FnOnce() + Send>);

impl ReadyNotifier {
    /// Creates a notifier from the provided closure.
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(func))
    }

    /// Emits the ready marker.
    pub fn notify(self) {
        (self.0)();
    }
}

/// Serves control writes until the transport closes, then stops every timer.
pub fn service_main_loop<R, C, S, T>(
    mux: &TimerMux<R, C, S>,
    transport: &mut T,
    notifier: ReadyNotifier,
) -> ServerResult<()>
where
    R: ReloadRegisters,
    C: IrqController,
    S: Signaler,
    T: Transport,
{
    notifier.notify();
    info!("tickmuxd: ready on {CONTROL_FILE_NAME}");
    let result = run_loop(mux, transport);
    if let Err(err) = &result {
        error!("tickmuxd: control channel failed: {err}");
    }
    mux.teardown();
    result
}

fn run_loop<R, C, S, T>(mux: &TimerMux<R, C, S>, transport: &mut T) -> ServerResult<()>
where
    R: ReloadRegisters,
    C: IrqController,
    S: Signaler,
    T: Transport,
{
    while let Some(frame) = transport.recv().map_err(|err| ServerError::Transport(err.into()))? {
        let mut output: Vec<String> = Vec::new();
        match mux.execute_write(&frame, &mut output) {
            Ok(summary) => {
                debug!("tickmuxd: write applied {} rejected {}", summary.applied, summary.rejected)
            }
            Err(err) => output.push(err.to_string()),
        }
        if output.is_empty() {
            continue;
        }
        let mut response = output.join("\n");
        response.push('\n');
        let sent = transport.send(response.as_bytes()).map_err(Into::<TransportError>::into);
        match sent {
            Ok(()) => {}
            Err(TransportError::Closed) => info!("tickmuxd: writer closed, reply dropped"),
            Err(err) => return Err(ServerError::Transport(err)),
        }
    }
    Ok(())
}
