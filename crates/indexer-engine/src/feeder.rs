//! Keep-alive stdin source for the agent process
//!
//! An agent that can run interactively may stop and wait for terminal
//! input. The feeder answers with a newline right away and then one more
//! newline per interval, until it is closed, after which every read
//! returns end-of-stream so the agent can finish on its own.

use std::io::{self, Read};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeederState {
    /// Nothing read yet; the next read returns a newline immediately
    Fresh,
    /// Each read waits one interval before returning a newline
    Armed,
    /// Terminal; reads return end-of-stream
    Closed,
}

#[derive(Debug, Default)]
struct Shared {
    closed: Mutex<bool>,
    wake: Condvar,
}

impl Shared {
    fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if !*closed {
            *closed = true;
            self.wake.notify_all();
        }
    }

    /// Sleeps up to `interval`; returns true if closed in the meantime
    fn wait_closed(&self, interval: Duration) -> bool {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        let (closed, _) = self
            .wake
            .wait_timeout_while(closed, interval, |closed| !*closed)
            .unwrap_or_else(PoisonError::into_inner);
        *closed
    }
}

/// Reader side of the keep-alive source
#[derive(Debug)]
pub struct NewlineFeeder {
    state: FeederState,
    interval: Duration,
    shared: Arc<Shared>,
}

/// Cancellation handle; closing is idempotent and wakes a waiting reader
#[derive(Debug, Clone)]
pub struct FeederCloser {
    shared: Arc<Shared>,
}

impl NewlineFeeder {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: FeederState::Fresh,
            interval,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn closer(&self) -> FeederCloser {
        FeederCloser {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl FeederCloser {
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Closes the feeder when the returned guard goes out of scope
    pub fn close_on_drop(&self) -> CloseGuard {
        CloseGuard {
            closer: self.clone(),
        }
    }
}

/// Closes its feeder on drop
#[derive(Debug)]
pub struct CloseGuard {
    closer: FeederCloser,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.closer.close();
    }
}

impl Read for NewlineFeeder {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        match self.state {
            FeederState::Closed => return Ok(0),
            FeederState::Fresh => {
                if self.shared.is_closed() {
                    self.state = FeederState::Closed;
                    return Ok(0);
                }
                self.state = FeederState::Armed;
            }
            FeederState::Armed => {
                if self.shared.wait_closed(self.interval) {
                    self.state = FeederState::Closed;
                    return Ok(0);
                }
            }
        }

        buf[0] = b'\n';
        Ok(1)
    }
}
