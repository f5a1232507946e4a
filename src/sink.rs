//! Output sinks that can be attached to a [`LogBuffer`](crate::LogBuffer).

use std::fs::File;
use std::io::{self, Stderr, Stdout, Write};
use std::net::{Shutdown, TcpStream};

/// A consumer of log bytes.
///
/// Writing goes through [`io::Write`]; the buffer always uses `write_all`, so a
/// short write counts as a failure and evicts the sink.
pub trait Sink: Write + Send {
    /// Signals the consumer that no more data will arrive.
    fn close(&mut self) -> io::Result<()>;
}

impl Sink for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.shutdown(Shutdown::Both)
    }
}

impl Sink for Stdout {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Sink for Stderr {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Sink for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Sink for Vec<u8> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Adapts any writer into a sink whose close flushes and drops the writer.
///
/// Writes after close fail with [`io::ErrorKind::BrokenPipe`].
pub struct WriterSink<W: Write + Send> {
    inner: Option<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn writer(&mut self) -> io::Result<&mut W> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink is closed"))
    }
}

impl<W: Write + Send> Write for WriterSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}
