//! One-shot broadcast event used to release attachers when a buffer closes.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// A flag that can be raised exactly once and waited on by any number of threads.
///
/// Waiters that arrive after the flag was raised return immediately.
#[derive(Debug, Default)]
pub struct Termination {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl Termination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag and wakes every waiter.
    ///
    /// Returns `true` only for the call that actually raised it.
    pub fn fire(&self) -> bool {
        let mut fired = self.fired.lock();
        if *fired {
            return false;
        }
        *fired = true;
        self.cond.notify_all();
        true
    }

    pub fn is_fired(&self) -> bool {
        *self.fired.lock()
    }

    /// Blocks until the flag is raised.
    pub fn wait(&self) {
        let mut fired = self.fired.lock();
        while !*fired {
            self.cond.wait(&mut fired);
        }
    }

    /// Blocks until the flag is raised or `timeout` elapses.
    ///
    /// Returns whether the flag was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut fired = self.fired.lock();
        if *fired {
            return true;
        }
        self.cond.wait_while_for(&mut fired, |fired| !*fired, timeout);
        *fired
    }
}
