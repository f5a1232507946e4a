use logbuffer::Sink;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Sink that records every byte it receives and how often it was closed.
///
/// Clones share the same record, so a test keeps one clone while the buffer owns the other.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingSink {
    received: Arc<Mutex<Vec<u8>>>,
    writes: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<u8> {
        self.received.lock().clone()
    }

    pub fn received_string(&self) -> String {
        String::from_utf8(self.received()).expect("test data is utf-8")
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.received.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for RecordingSink {
    fn close(&mut self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink that accepts a fixed number of writes, then fails every one after.
#[derive(Clone)]
#[allow(dead_code)]
pub struct FailingSink {
    inner: RecordingSink,
    remaining: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FailingSink {
    pub fn after(successful_writes: usize) -> Self {
        Self {
            inner: RecordingSink::new(),
            remaining: Arc::new(AtomicUsize::new(successful_writes)),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn received(&self) -> Vec<u8> {
        self.inner.received()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes()
    }
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let allowed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if allowed {
            self.inner.write(buf)
        } else {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "viewer went away"))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for FailingSink {
    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

/// Polls `condition` until it holds, panicking after a generous deadline.
#[allow(dead_code)]
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Sink that fails its first `failures` writes, then accepts everything.
#[derive(Clone)]
#[allow(dead_code)]
pub struct FlakySink {
    inner: RecordingSink,
    failures: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FlakySink {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            inner: RecordingSink::new(),
            failures: Arc::new(AtomicUsize::new(failures)),
        }
    }

    pub fn received_string(&self) -> String {
        self.inner.received_string()
    }
}

impl Write for FlakySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "viewer is not ready"))
        } else {
            self.inner.write(buf)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for FlakySink {
    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}
