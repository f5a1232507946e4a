//! Append-only log buffer with live fan-out to attached sinks.
//!
//! Writers append bytes; every append is mirrored to each attached sink. A sink
//! attached late first receives the whole backlog, then live data, with no gap
//! or duplication. Closing the buffer closes every sink and releases every
//! blocked [`LogBuffer::attach`] call.

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::Config;
use crate::error::{LogBufferError, LogBufferResult};
use crate::signal::Termination;
use crate::sink::Sink;

struct State {
    content: Vec<u8>,
    sinks: Vec<Box<dyn Sink>>,
    closed: bool,
}

struct Shared {
    name: Option<String>,
    state: Mutex<State>,
    termination: Termination,
}

/// A thread-safe, append-only byte history that broadcasts writes to attached sinks.
///
/// Cloning is cheap and yields another handle to the same buffer, so a single
/// buffer can be fed by a writer thread while each viewer thread attaches.
///
/// Tracing events are only emitted after the internal lock is released, since
/// the buffer may itself be the destination of tracing output (see the
/// [`MakeWriter`] impl).
#[derive(Clone)]
pub struct LogBuffer {
    shared: Arc<Shared>,
}

/// Outcome of registering a sink with the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The sink now receives live writes.
    Live,
    /// The buffer was already closed; the sink received the backlog and was closed.
    Closed,
}

/// A sink registration whose end can be awaited.
///
/// Returned by [`LogBuffer::subscribe`]. Dropping it does not detach the sink.
#[must_use = "an attachment does nothing unless waited on"]
pub struct Attachment {
    buffer: LogBuffer,
    registration: Registration,
}

impl Attachment {
    pub fn registration(&self) -> Registration {
        self.registration
    }

    /// Blocks until the buffer closes.
    pub fn wait(self) {
        self.buffer.wait_closed();
    }

    /// Blocks until the buffer closes or `timeout` elapses; returns whether it closed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.buffer.wait_closed_timeout(timeout)
    }
}

impl LogBuffer {
    /// Creates an empty, open buffer with default configuration.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: config.name.clone(),
                state: Mutex::new(State {
                    content: Vec::with_capacity(config.initial_capacity),
                    sinks: Vec::new(),
                    closed: false,
                }),
                termination: Termination::new(),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }

    fn label(&self) -> &str {
        self.name().unwrap_or("-")
    }

    /// Appends `data` and forwards it to every attached sink, in attach order.
    ///
    /// Always reports the full length as written. A sink that fails to accept
    /// the chunk is dropped from the active set without being closed and never
    /// sees another byte. Writing after close still appends to the history.
    pub fn write(&self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let evicted = {
            let mut state = self.shared.state.lock();
            state.content.extend_from_slice(data);

            let before = state.sinks.len();
            state.sinks.retain_mut(|sink| sink.write_all(data).is_ok());
            before - state.sinks.len()
        };

        if evicted > 0 {
            debug!(buffer = self.label(), evicted, "Evicted sinks that failed to accept a write");
        }

        Ok(data.len())
    }

    /// Delivers the backlog to `sink` and registers it for live writes, without blocking.
    ///
    /// Backlog delivery and registration happen under one lock acquisition, so
    /// the sink sees every byte exactly once relative to concurrent writes.
    /// A failed backlog write does not prevent registration; a sink that keeps
    /// failing is evicted by the next live write.
    pub fn subscribe<S: Sink + 'static>(&self, sink: S) -> Attachment {
        let mut sink: Box<dyn Sink> = Box::new(sink);

        let (registration, backlog, delivered) = {
            let mut state = self.shared.state.lock();
            let delivered = sink.write_all(&state.content).is_ok();

            let registration = if state.closed {
                let _ = sink.close();
                Registration::Closed
            } else {
                state.sinks.push(sink);
                Registration::Live
            };

            (registration, state.content.len(), delivered)
        };

        debug!(buffer = self.label(), ?registration, backlog, delivered, "Sink attached");

        Attachment {
            buffer: self.clone(),
            registration,
        }
    }

    /// Delivers the backlog to `sink`, streams live writes to it, and blocks until the buffer closes.
    ///
    /// Meant to run on a dedicated thread per consumer. If the buffer is already
    /// closed, the sink is closed right after the backlog and this returns
    /// immediately. Closing the sink from elsewhere does not unblock this call.
    pub fn attach<S: Sink + 'static>(&self, sink: S) {
        self.subscribe(sink).wait();
    }

    /// Closes every attached sink and releases every blocked attacher.
    ///
    /// Errors from closing individual sinks are ignored. A second call returns
    /// [`LogBufferError::AlreadyClosed`] and has no other effect.
    pub fn close(&self) -> LogBufferResult<()> {
        let closed_sinks = {
            let mut state = self.shared.state.lock();
            if state.closed {
                None
            } else {
                let sinks = std::mem::take(&mut state.sinks);
                let count = sinks.len();
                for mut sink in sinks {
                    let _ = sink.close();
                }

                state.closed = true;
                self.shared.termination.fire();
                Some(count)
            }
        };

        match closed_sinks {
            Some(count) => {
                debug!(buffer = self.label(), sinks = count, "Log buffer closed");
                Ok(())
            }
            None => {
                debug!(buffer = self.label(), "Rejected close of an already closed log buffer");
                Err(LogBufferError::AlreadyClosed)
            }
        }
    }

    /// Returns a copy of everything written so far.
    pub fn content(&self) -> Vec<u8> {
        self.shared.state.lock().content.clone()
    }

    /// Copies `reader` into the buffer until EOF, returning the number of bytes copied.
    ///
    /// The buffer is left open.
    pub fn capture<R: Read>(&self, mut reader: R) -> io::Result<u64> {
        let mut writer = self.clone();
        io::copy(&mut reader, &mut writer)
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.shared.termination.is_fired()
    }

    /// Number of sinks currently receiving live writes.
    pub fn sink_count(&self) -> usize {
        self.shared.state.lock().sinks.len()
    }

    /// Blocks until the buffer closes, without attaching anything.
    pub fn wait_closed(&self) {
        self.shared.termination.wait();
    }

    /// Blocks until the buffer closes or `timeout` elapses; returns whether it closed.
    pub fn wait_closed_timeout(&self, timeout: Duration) -> bool {
        self.shared.termination.wait_timeout(timeout)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LogBuffer")
            .field("name", &self.shared.name)
            .field("len", &state.content.len())
            .field("sinks", &state.sinks.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        LogBuffer::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Fan-out is synchronous, so there is nothing pending
        Ok(())
    }
}

/// Routes tracing output into the buffer.
///
/// Fan-out runs with the buffer's lock held, and the lock is not reentrant.
/// A sink attached to this buffer must not emit tracing events that are
/// routed back into the same buffer, or the writing thread deadlocks. Sinks
/// that log to a different subscriber or writer are unaffected.
impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
